//! Reads a product price from a rendered web page.
//!
//! Pages are loaded in a headless Chromium so client-side rendered prices are
//! visible. After navigation we wait for the network to go quiet, snapshot the
//! DOM and pick the price element out of it with a CSS selector.

use std::{collections::HashSet, path::PathBuf, time::Duration};

use async_trait::async_trait;
use chromiumoxide::{
    cdp::browser_protocol::network::{
        EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    },
    Browser, BrowserConfig,
};
use futures_util::{stream, Stream, StreamExt};
use regex::Regex;
use scraper::{Html, Selector};

use crate::{config::Settings, error::ExtractionError};

#[async_trait]
pub trait PriceExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<f64, ExtractionError>;
}

/// Where the price lives on a page and how to clean its text.
#[derive(Debug, Clone)]
pub struct PriceRule {
    selector: String,
    strip: Option<Regex>,
}

impl PriceRule {
    pub fn new(selector: &str, strip_chars: &str) -> Result<Self, ExtractionError> {
        Selector::parse(selector)
            .map_err(|_| ExtractionError::InvalidSelector(selector.to_string()))?;

        let strip = if strip_chars.is_empty() {
            None
        } else {
            let class: String = strip_chars
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect();
            let re = Regex::new(&format!("[{class}]"))
                .map_err(|e| ExtractionError::InvalidSelector(e.to_string()))?;
            Some(re)
        };

        Ok(Self {
            selector: selector.to_string(),
            strip,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ExtractionError> {
        Self::new(&settings.price_selector, &settings.price_strip_chars)
    }

    /// Turns element text like `₹1,299.` into `1299.0`.
    ///
    /// Configured symbols are removed, then the leading numeric run is parsed;
    /// anything after it (a trailing unit, a second price) is ignored.
    pub fn parse_price(&self, text: &str) -> Result<f64, ExtractionError> {
        let cleaned = match &self.strip {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };

        let numeric: String = cleaned
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        match numeric.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(ExtractionError::Unparseable(text.trim().to_string())),
        }
    }

    pub fn extract_from_html(&self, html: &str) -> Result<f64, ExtractionError> {
        let selector = Selector::parse(&self.selector)
            .map_err(|_| ExtractionError::InvalidSelector(self.selector.clone()))?;

        let doc = Html::parse_document(html);
        let text = doc
            .select(&selector)
            .next()
            .map(|e| e.text().collect::<String>())
            .ok_or_else(|| ExtractionError::SelectorMissing(self.selector.clone()))?;

        self.parse_price(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NetEvent {
    Started(String),
    Done(String),
}

/// Resolves once at most `max_inflight` requests have been pending for a full
/// `quiet` window, or when the event stream ends.
pub(crate) async fn wait_for_network_idle<S>(mut events: S, quiet: Duration, max_inflight: usize)
where
    S: Stream<Item = NetEvent> + Unpin,
{
    let mut inflight: HashSet<String> = HashSet::new();

    loop {
        let idle = inflight.len() <= max_inflight;

        tokio::select! {
            ev = events.next() => match ev {
                Some(NetEvent::Started(id)) => { inflight.insert(id); }
                Some(NetEvent::Done(id)) => { inflight.remove(&id); }
                None => return,
            },
            _ = tokio::time::sleep(quiet), if idle => return,
        }
    }
}

/// Launches a fresh headless browser per extraction and always tears it down.
pub struct BrowserExtractor {
    rule: PriceRule,
    timeout: Duration,
    network_idle: Duration,
    max_inflight: usize,
    chrome_executable: Option<PathBuf>,
}

impl BrowserExtractor {
    pub fn from_settings(settings: &Settings) -> Result<Self, ExtractionError> {
        let rule = PriceRule::from_settings(settings)?;

        // the caller bounds launch + render + teardown by extract_timeout,
        // rendering gets what is left after launch and teardown
        let timeout = settings
            .extract_timeout
            .saturating_sub(Duration::from_secs(10))
            .max(Duration::from_secs(5));

        Ok(Self {
            rule,
            timeout,
            network_idle: settings.network_idle,
            max_inflight: settings.network_idle_max_inflight,
            chrome_executable: settings.chrome_executable.as_ref().map(PathBuf::from),
        })
    }

    fn browser_config(&self) -> Result<BrowserConfig, ExtractionError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.timeout);

        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(ExtractionError::BrowserLaunch)
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<String, ExtractionError> {
        let nav = |e: chromiumoxide::error::CdpError| ExtractionError::Navigation(e.to_string());

        let page = browser.new_page("about:blank").await.map_err(nav)?;

        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(nav)?
            .map(|e| NetEvent::Started(e.request_id.inner().clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(nav)?
            .map(|e| NetEvent::Done(e.request_id.inner().clone()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(nav)?
            .map(|e| NetEvent::Done(e.request_id.inner().clone()));

        page.goto(url).await.map_err(nav)?;

        let events = stream::select(stream::select(started, finished), failed);
        futures_util::pin_mut!(events);
        wait_for_network_idle(events, self.network_idle, self.max_inflight).await;

        page.content().await.map_err(nav)
    }
}

/// Aborts the CDP handler task when dropped, including when `extract` is
/// cancelled by an outer timeout.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl PriceExtractor for BrowserExtractor {
    async fn extract(&self, url: &str) -> Result<f64, ExtractionError> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| ExtractionError::BrowserLaunch(e.to_string()))?;

        let _handler_task = AbortOnDrop(tokio::spawn(async move {
            while handler.next().await.is_some() {}
        }));

        let rendered = match tokio::time::timeout(self.timeout, self.render(&browser, url)).await {
            Ok(res) => res,
            Err(_) => Err(ExtractionError::Timeout(self.timeout.as_secs())),
        };

        // Teardown runs on every path; dropping the browser kills the child
        // process if the graceful close does not go through.
        let grace = Duration::from_secs(5);
        match tokio::time::timeout(grace, browser.close()).await {
            Ok(Ok(_)) => {
                let _ = tokio::time::timeout(grace, browser.wait()).await;
            }
            Ok(Err(e)) => tracing::debug!("browser close failed for {}: {}", url, e),
            Err(_) => tracing::debug!("browser close timed out for {}", url),
        }
        drop(browser);

        let html = rendered?;
        self.rule.extract_from_html(&html)
    }
}
