mod common;

use axum::http::{header, Request, StatusCode};
use common::{harness, Step};
use http_body_util::BodyExt;
use mongodb::bson::oid::ObjectId;
use pricewatch::{
    routes,
    services::{
        monitor_service::{self, NewMonitor},
        monitor_store::MonitorStore,
    },
};
use tower::ServiceExt;

const URL: &str = "https://shop.example/item/1";

async fn response_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_request(token: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri("/api/monitors")
        .header("x-auth-token", token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn list_without_token_returns_401() {
    let h = harness();
    let app = routes::app(h.state.clone());

    let req = Request::builder()
        .uri("/api/monitors")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(res).await;
    assert_eq!(body["msg"], "No token, authorization denied");
}

#[tokio::test]
async fn list_with_invalid_token_returns_401() {
    let h = harness();
    let app = routes::app(h.state.clone());

    let req = Request::builder()
        .uri("/api/monitors")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_json(res).await["msg"], "Token is not valid");
}

#[tokio::test]
async fn create_returns_monitor_with_seeded_history() {
    let h = harness();
    h.extractor.set(URL, Step::Price(520.0));
    let owner = ObjectId::new();
    let app = routes::app(h.state.clone());

    let req = create_request(
        &h.token_for(&owner),
        serde_json::json!({ "url": URL, "email": "me@example.com", "targetPrice": 500 }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["user"], owner.to_hex());
    assert_eq!(body["currentPrice"], 520.0);
    assert_eq!(body["targetPrice"], 500.0);
    assert_eq!(body["priceHistory"].as_array().unwrap().len(), 1);
    assert_eq!(h.mailer.count(), 0);
}

#[tokio::test]
async fn create_accepts_target_price_as_text() {
    let h = harness();
    h.extractor.set(URL, Step::Price(520.0));
    let app = routes::app(h.state.clone());

    let req = create_request(
        &h.token_for(&ObjectId::new()),
        serde_json::json!({ "url": URL, "email": "me@example.com", "targetPrice": "499.5" }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["targetPrice"], 499.5);
}

#[tokio::test]
async fn create_with_unreadable_page_returns_400() {
    let h = harness();
    h.extractor.set(URL, Step::Missing);
    let app = routes::app(h.state.clone());

    let req = create_request(
        &h.token_for(&ObjectId::new()),
        serde_json::json!({ "url": URL, "email": "me@example.com", "targetPrice": 500 }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(res).await["message"], "could not determine initial price");
    assert!(h.store.inner.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_with_bad_target_returns_400_without_scraping() {
    let h = harness();
    let app = routes::app(h.state.clone());

    let req = create_request(
        &h.token_for(&ObjectId::new()),
        serde_json::json!({ "url": URL, "email": "me@example.com", "targetPrice": "cheap" }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(h.extractor.calls().is_empty());
}

#[tokio::test]
async fn create_with_undeliverable_email_returns_400() {
    let h = harness();
    h.extractor.set(URL, Step::Price(520.0));
    let app = routes::app(h.state.clone());

    for email in ["a@b@shop.example", "no-at-sign", "two words@shop.example"] {
        let req = create_request(
            &h.token_for(&ObjectId::new()),
            serde_json::json!({ "url": URL, "email": email, "targetPrice": 500 }),
        );

        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{email}");
        assert_eq!(response_json(res).await["message"], "Please enter a valid email.");
    }

    assert!(h.extractor.calls().is_empty());
    assert!(h.store.inner.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_returns_only_own_monitors() {
    let h = harness();
    h.extractor.set(URL, Step::Price(520.0));
    let alice = ObjectId::new();
    let bob = ObjectId::new();

    let input = || NewMonitor {
        url: URL.to_string(),
        email: "me@example.com".to_string(),
        target_price: 500.0,
    };
    let mine = monitor_service::create_monitor(&h.state, alice, input()).await.unwrap();
    monitor_service::create_monitor(&h.state, bob, input()).await.unwrap();

    let app = routes::app(h.state.clone());
    let req = Request::builder()
        .uri("/api/monitors")
        .header("x-auth-token", h.token_for(&alice))
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], mine.id.to_hex());
}

#[tokio::test]
async fn delete_enforces_ownership() {
    let h = harness();
    h.extractor.set(URL, Step::Price(520.0));
    let alice = ObjectId::new();
    let bob = ObjectId::new();

    let m = monitor_service::create_monitor(
        &h.state,
        alice,
        NewMonitor {
            url: URL.to_string(),
            email: "me@example.com".to_string(),
            target_price: 500.0,
        },
    )
    .await
    .unwrap();

    let delete = |token: String, id: String| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/monitors/{id}"))
            .header("x-auth-token", token)
            .body(axum::body::Body::empty())
            .unwrap()
    };

    let app = routes::app(h.state.clone());

    let res = app
        .clone()
        .oneshot(delete(h.token_for(&bob), m.id.to_hex()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(h.store.inner.find_by_id(m.id).await.unwrap().is_some());

    let res = app
        .clone()
        .oneshot(delete(h.token_for(&alice), ObjectId::new().to_hex()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .oneshot(delete(h.token_for(&alice), m.id.to_hex()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["msg"], "Monitor removed");
    assert!(h.store.inner.find_by_id(m.id).await.unwrap().is_none());
}

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let app = routes::app(h.state.clone());

    let req = Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
