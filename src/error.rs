use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Why a price could not be read from a page. Always recoverable per monitor.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("price element not found for selector `{0}`")]
    SelectorMissing(String),

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("could not parse price from `{0}`")]
    Unparseable(String),

    #[error("page load failed: {0}")]
    Navigation(String),

    #[error("extraction timed out after {0}s")]
    Timeout(u64),

    /// The rendering engine itself could not start.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),
}

impl ExtractionError {
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, ExtractionError::BrowserLaunch(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("monitor not found")]
    NotFound,

    #[error("db error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error("could not build message: {0}")]
    Message(String),

    #[error("email transport error: {0}")]
    Transport(String),

    #[error("live push failed: connection closed")]
    ConnectionClosed,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing token")]
    Missing,

    #[error("invalid token")]
    Invalid,
}

/// Errors surfaced to HTTP callers of the monitor API.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("could not determine initial price")]
    InitialPrice(#[source] ExtractionError),

    #[error("Monitor not found")]
    NotFound,

    #[error("Not authorized")]
    NotAuthorized,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for MonitorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => MonitorError::NotFound,
            other => MonitorError::Store(other),
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match &self {
            MonitorError::InvalidInput(_) | MonitorError::InitialPrice(_) => StatusCode::BAD_REQUEST,
            MonitorError::NotFound => StatusCode::NOT_FOUND,
            MonitorError::NotAuthorized => StatusCode::UNAUTHORIZED,
            MonitorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Conditions that stop a whole monitoring cycle rather than one monitor.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("previous cycle still running")]
    AlreadyRunning,

    #[error("could not load monitors: {0}")]
    Store(#[from] StoreError),

    #[error("rendering engine unavailable: {0}")]
    EngineUnavailable(ExtractionError),
}
