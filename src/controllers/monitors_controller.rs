use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::MonitorError,
    models::CurrentUser,
    services::monitor_service::{self, NewMonitor},
    AppState,
};

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "msg": "No token, authorization denied" })),
    )
        .into_response()
}

// forms post the target as text, API clients as a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn value(&self) -> Option<f64> {
        match self {
            PriceInput::Number(n) => Some(*n),
            PriceInput::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMonitorBody {
    pub url: String,
    pub email: String,
    #[serde(rename = "targetPrice")]
    pub target_price: PriceInput,
}

// GET /api/monitors
pub async fn get_monitors(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match monitor_service::list_user_monitors(&state, u.id).await {
        Ok(items) => {
            let items: Vec<serde_json::Value> = items.iter().map(|m| m.to_json()).collect();
            (StatusCode::OK, Json(serde_json::Value::Array(items))).into_response()
        }
        Err(e) => {
            tracing::error!("fetch monitors error: {}", e);
            e.into_response()
        }
    }
}

// POST /api/monitors
pub async fn post_monitor(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreateMonitorBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Some(target_price) = body.target_price.value() else {
        return MonitorError::InvalidInput("Please enter a valid target price.".into()).into_response();
    };

    let input = NewMonitor {
        url: body.url,
        email: body.email,
        target_price,
    };

    match monitor_service::create_monitor(&state, u.id, input).await {
        Ok(m) => (StatusCode::OK, Json(m.to_json())).into_response(),
        Err(e) => e.into_response(),
    }
}

// DELETE /api/monitors/:id
pub async fn delete_monitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let oid = match ObjectId::parse_str(&id) {
        Ok(x) => x,
        Err(_) => return MonitorError::NotFound.into_response(),
    };

    match monitor_service::delete_monitor(&state, u.id, oid).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "msg": "Monitor removed" }))).into_response(),
        Err(e) => e.into_response(),
    }
}
