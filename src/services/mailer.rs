use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{config::Settings, error::NotifyError, models::Monitor};

pub const ALERT_SUBJECT: &str = "Price Drop Alert!";

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn from_settings(settings: &Settings) -> Result<Self, NotifyError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !settings.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.smtp_username.clone(),
                settings.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: settings.email_from.clone(),
        })
    }
}

fn mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.trim()
        .parse::<Mailbox>()
        .map_err(|_| NotifyError::InvalidAddress(addr.to_string()))
}

#[async_trait]
impl EmailTransport for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        let msg = Message::builder()
            .from(mailbox(&self.from)?)
            .to(mailbox(to)?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        self.transport
            .send(msg)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(())
    }
}

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Indian digit grouping (`12,34,567.5`), at most two decimals.
pub fn format_inr(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let grouped = if int_part.len() <= 3 {
        int_part.to_string()
    } else {
        let (head, last3) = int_part.split_at(int_part.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (h, t) = rest.split_at(rest.len() - 2);
            groups.push(t);
            rest = h;
        }
        if !rest.is_empty() {
            groups.push(rest);
        }
        groups.reverse();
        format!("{},{}", groups.join(","), last3)
    };

    let frac = frac_part.trim_end_matches('0');
    let sign = if value < 0.0 { "-" } else { "" };

    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

pub fn price_alert_html(monitor: &Monitor, new_price: f64) -> String {
    let url = esc(&monitor.url);

    format!(
        r#"<div style="font-family: Arial, sans-serif; line-height:1.6; color:#333; padding:20px;">
    <h2 style="margin-bottom:10px;">Price Drop Alert</h2>
    <p>The price of your monitored product has changed.</p>
    <p>
        <strong>Current Price:</strong> ₹{current} <br />
        <strong>Your Target Price:</strong> ₹{target}
    </p>
    <p>
        You can view the product here:<br />
        <a href="{url}" target="_blank">{url}</a>
    </p>
    <p style="margin-top:20px; font-size:12px; color:#777;">
        This is an automated message from your Price Monitor app.
    </p>
</div>"#,
        current = format_inr(new_price),
        target = format_inr(monitor.target_price),
    )
}
