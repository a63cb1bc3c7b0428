//! Library entrypoint for PriceWatch.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services).

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{
    extractor::PriceExtractor, identity::TokenVerifier, mailer::EmailTransport,
    monitor_store::MonitorStore, notifier::Notifier, sessions::SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn MonitorStore>,
    pub extractor: Arc<dyn PriceExtractor>,
    pub sessions: SessionRegistry,
    pub notifier: Notifier,
    pub identity: TokenVerifier,
    // held for the duration of a monitoring cycle
    pub cycle_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        store: Arc<dyn MonitorStore>,
        extractor: Arc<dyn PriceExtractor>,
        mailer: Arc<dyn EmailTransport>,
    ) -> Self {
        let sessions = SessionRegistry::new();
        let notifier = Notifier::new(sessions.clone(), mailer);
        let identity = TokenVerifier::new(settings.jwt_secret.clone());

        Self {
            settings,
            store,
            extractor,
            sessions,
            notifier,
            identity,
            cycle_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}
