use axum::{
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{models::CurrentUser, AppState};

pub const TOKEN_HEADER: &str = "x-auth-token";

/// Token from `x-auth-token`, falling back to `Authorization: Bearer`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        let v = v.trim();
        if !v.is_empty() {
            return Some(v.to_string());
        }
    }

    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        if let Ok(user_id) = state.identity.verify(&token) {
            req.extensions_mut().insert(CurrentUser { id: user_id });
        }
    }

    next.run(req).await
}

fn is_protected_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

pub async fn require_auth(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !is_protected_path(req.uri().path()) {
        return next.run(req).await;
    }

    // If inject_current_user already put CurrentUser in extensions => authenticated
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    let msg = if bearer_token(req.headers()).is_some() {
        "Token is not valid"
    } else {
        "No token, authorization denied"
    };

    (StatusCode::UNAUTHORIZED, Json(json!({ "msg": msg }))).into_response()
}
