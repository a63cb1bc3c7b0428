use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use pricewatch::{
    config, routes,
    services::{
        db_init, extractor::BrowserExtractor, mailer::SmtpMailer, monitor_store::MongoMonitorStore,
        price_checker,
    },
    AppState,
};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!("could not ensure indexes: {}", e);
    }

    let extractor = BrowserExtractor::from_settings(&settings).expect("invalid price extraction settings");
    let mailer = SmtpMailer::from_settings(&settings).expect("invalid SMTP settings");
    if settings.smtp_username.is_empty() {
        tracing::warn!("SMTP_USERNAME is not set, price alert emails will likely be rejected");
    }

    tracing::info!(
        "price selector `{}`, stripping `{}`",
        settings.price_selector,
        settings.price_strip_chars
    );

    let state = AppState::new(
        settings.clone(),
        Arc::new(MongoMonitorStore::new(db)),
        Arc::new(extractor),
        Arc::new(mailer),
    );

    let checker = price_checker::spawn_price_checker(state.clone());

    let app = routes::app(state.clone());

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {}", e);
    }

    checker.abort();
    state.sessions.clear();
    tracing::info!("shut down");
}
