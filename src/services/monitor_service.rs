use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::MonitorError,
    models::Monitor,
    services::price_checker,
    AppState,
};

#[derive(Debug, Clone)]
pub struct NewMonitor {
    pub url: String,
    pub email: String,
    pub target_price: f64,
}

fn validate(input: &NewMonitor) -> Result<(), MonitorError> {
    let url = input.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(MonitorError::InvalidInput("Please enter a valid product URL.".into()));
    }

    // same parser the mailer uses, so a stored address is always deliverable
    if input.email.trim().parse::<lettre::Address>().is_err() {
        return Err(MonitorError::InvalidInput("Please enter a valid email.".into()));
    }

    if !input.target_price.is_finite() || input.target_price <= 0.0 {
        return Err(MonitorError::InvalidInput("Please enter a valid target price.".into()));
    }

    Ok(())
}

pub async fn list_user_monitors(state: &AppState, user_id: ObjectId) -> Result<Vec<Monitor>, MonitorError> {
    Ok(state.store.find_by_owner(user_id).await?)
}

/// Checks the page once right away; the monitor is only stored if that
/// first extraction succeeds.
pub async fn create_monitor(
    state: &AppState,
    user_id: ObjectId,
    input: NewMonitor,
) -> Result<Monitor, MonitorError> {
    validate(&input)?;

    let url = input.url.trim().to_string();
    let initial_price = price_checker::extract_with_timeout(state, &url)
        .await
        .map_err(|e| {
            tracing::warn!("initial extraction for {} failed: {}", url, e);
            MonitorError::InitialPrice(e)
        })?;

    let monitor = Monitor::new(
        user_id,
        url,
        input.email.trim().to_string(),
        input.target_price,
        initial_price,
        Utc::now().timestamp(),
    );

    state.store.insert(&monitor).await?;
    tracing::info!("monitor {} created at {}", monitor.id, initial_price);

    if monitor.is_at_or_below_target(initial_price) {
        state.notifier.email_alert(&monitor, initial_price).await;
    }

    Ok(monitor)
}

pub async fn delete_monitor(state: &AppState, user_id: ObjectId, id: ObjectId) -> Result<(), MonitorError> {
    let monitor = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(MonitorError::NotFound)?;

    if monitor.user_id != user_id {
        return Err(MonitorError::NotAuthorized);
    }

    if !state.store.delete_by_id(id).await? {
        return Err(MonitorError::NotFound);
    }

    Ok(())
}
