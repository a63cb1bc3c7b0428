use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{task::JoinHandle, time};

use crate::{
    error::{CycleError, ExtractionError, StoreError},
    models::Monitor,
    services::notifier::NotifyOutcome,
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckOutcome {
    Unchanged,
    Changed { price: f64, notified: NotifyOutcome },
    ExtractionFailed,
    PersistFailed,
    /// Deleted by its owner while the cycle was running.
    Vanished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub persist_failed: usize,
    pub alerts_sent: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &CheckOutcome) {
        self.checked += 1;
        match outcome {
            CheckOutcome::Unchanged => self.unchanged += 1,
            CheckOutcome::Changed { notified, .. } => {
                self.changed += 1;
                if notified.emailed {
                    self.alerts_sent += 1;
                }
            }
            CheckOutcome::ExtractionFailed => self.failed += 1,
            CheckOutcome::PersistFailed => self.persist_failed += 1,
            CheckOutcome::Vanished => {}
        }
    }
}

/// Time left until the next multiple of `cadence` since the unix epoch, so a
/// 4 hour cadence fires at 00:00, 04:00, 08:00 ... UTC.
pub fn until_next_tick(now: DateTime<Utc>, cadence: Duration) -> Duration {
    let period = (cadence.as_millis() as i64).max(1);
    let now_ms = now.timestamp_millis();
    let next = (now_ms.div_euclid(period) + 1) * period;
    Duration::from_millis((next - now_ms) as u64)
}

pub fn spawn_price_checker(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let cadence = state.settings.check_interval;
        tracing::info!("price checker started, cadence {}s", cadence.as_secs());

        loop {
            time::sleep(until_next_tick(Utc::now(), cadence)).await;

            match run_cycle(&state).await {
                Ok(report) => tracing::info!(
                    checked = report.checked,
                    changed = report.changed,
                    unchanged = report.unchanged,
                    failed = report.failed,
                    persist_failed = report.persist_failed,
                    alerts_sent = report.alerts_sent,
                    "price check cycle finished"
                ),
                Err(CycleError::AlreadyRunning) => {
                    tracing::warn!("skipping tick: previous price check cycle still running")
                }
                Err(e) => tracing::error!("price check cycle aborted: {}", e),
            }
        }
    })
}

/// One pass over every monitor. Monitors are processed one after another;
/// a failure on one of them never stops the others.
pub async fn run_cycle(state: &AppState) -> Result<CycleReport, CycleError> {
    let Ok(_guard) = state.cycle_lock.try_lock() else {
        return Err(CycleError::AlreadyRunning);
    };

    let monitors = state.store.find_all().await?;
    tracing::info!("running price check for {} monitors", monitors.len());

    let mut report = CycleReport::default();
    for monitor in monitors {
        let outcome = check_monitor(state, monitor).await?;
        report.record(&outcome);
    }

    Ok(report)
}

/// extract -> compare -> persist -> notify for a single monitor.
pub async fn check_monitor(state: &AppState, mut monitor: Monitor) -> Result<CheckOutcome, CycleError> {
    let price = match extract_with_timeout(state, &monitor.url).await {
        Ok(p) => p,
        Err(e) if e.is_engine_failure() => return Err(CycleError::EngineUnavailable(e)),
        Err(e) => {
            tracing::warn!("monitor {} ({}): {}", monitor.id, monitor.url, e);
            return Ok(CheckOutcome::ExtractionFailed);
        }
    };

    let now = Utc::now().timestamp();
    if !monitor.record_price(price, now, state.settings.history_max_samples) {
        tracing::debug!("monitor {}: price unchanged at {}", monitor.id, price);
        return Ok(CheckOutcome::Unchanged);
    }

    let updated = match state.store.save(&monitor).await {
        Ok(m) => m,
        Err(StoreError::NotFound) => {
            tracing::debug!("monitor {} was deleted during the cycle", monitor.id);
            return Ok(CheckOutcome::Vanished);
        }
        Err(e) => {
            tracing::warn!("monitor {}: could not persist new price: {}", monitor.id, e);
            return Ok(CheckOutcome::PersistFailed);
        }
    };

    tracing::info!("monitor {}: price changed to {}", updated.id, price);

    let notified = state.notifier.notify(&updated, price).await;
    Ok(CheckOutcome::Changed { price, notified })
}

/// Runs the extractor under the configured bound; a hang counts as a failed
/// extraction.
pub async fn extract_with_timeout(state: &AppState, url: &str) -> Result<f64, ExtractionError> {
    let limit = state.settings.extract_timeout;

    match time::timeout(limit, state.extractor.extract(url)).await {
        Ok(res) => res,
        Err(_) => Err(ExtractionError::Timeout(limit.as_secs())),
    }
}
