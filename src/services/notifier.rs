use std::sync::Arc;

use serde_json::json;

use crate::{
    error::NotifyError,
    models::Monitor,
    services::{
        mailer::{self, EmailTransport},
        sessions::SessionRegistry,
    },
};

pub const PRICE_UPDATE_EVENT: &str = "priceUpdate";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub pushed: bool,
    pub emailed: bool,
}

/// Fans a price change out to the owner's live session and, when the target
/// is met, to the alert email. Each channel fails on its own and failures are
/// only logged.
#[derive(Clone)]
pub struct Notifier {
    sessions: SessionRegistry,
    mailer: Arc<dyn EmailTransport>,
}

impl Notifier {
    pub fn new(sessions: SessionRegistry, mailer: Arc<dyn EmailTransport>) -> Self {
        Self { sessions, mailer }
    }

    pub async fn notify(&self, monitor: &Monitor, new_price: f64) -> NotifyOutcome {
        let pushed = match self.push_update(monitor) {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::warn!("live push for monitor {} failed: {}", monitor.id, e);
                false
            }
        };

        let emailed = if monitor.is_at_or_below_target(new_price) {
            self.email_alert(monitor, new_price).await
        } else {
            false
        };

        NotifyOutcome { pushed, emailed }
    }

    /// Ok(false) when the owner simply has no open session.
    pub fn push_update(&self, monitor: &Monitor) -> Result<bool, NotifyError> {
        let Some(handle) = self.sessions.lookup(&monitor.user_id) else {
            return Ok(false);
        };

        let payload = json!({
            "event": PRICE_UPDATE_EVENT,
            "monitor": monitor.to_json(),
        })
        .to_string();

        handle.deliver(payload)?;
        Ok(true)
    }

    /// Sends the alert email; returns whether it went out.
    pub async fn email_alert(&self, monitor: &Monitor, price: f64) -> bool {
        let html = mailer::price_alert_html(monitor, price);

        match self.mailer.send(&monitor.email, mailer::ALERT_SUBJECT, &html).await {
            Ok(()) => {
                tracing::info!("price alert sent to {} for monitor {}", monitor.email, monitor.id);
                true
            }
            Err(e) => {
                tracing::error!("price alert to {} failed: {}", monitor.email, e);
                false
            }
        }
    }
}
