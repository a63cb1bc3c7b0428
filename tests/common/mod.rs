#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use pricewatch::{
    config::Settings,
    error::{ExtractionError, NotifyError, StoreError},
    models::Monitor,
    services::{
        extractor::PriceExtractor,
        mailer::EmailTransport,
        monitor_store::{MemoryMonitorStore, MonitorStore},
    },
    AppState,
};

#[derive(Debug, Clone, Copy)]
pub enum Step {
    Price(f64),
    Missing,
    Hang,
    LaunchFailure,
}

/// Extractor whose answer per URL is set by the test.
#[derive(Default)]
pub struct ScriptedExtractor {
    steps: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn set(&self, url: &str, step: Step) {
        self.steps.lock().unwrap().insert(url.to_string(), step);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceExtractor for ScriptedExtractor {
    async fn extract(&self, url: &str) -> Result<f64, ExtractionError> {
        self.calls.lock().unwrap().push(url.to_string());
        let step = self.steps.lock().unwrap().get(url).copied().unwrap_or(Step::Missing);

        match step {
            Step::Price(p) => Ok(p),
            Step::Missing => Err(ExtractionError::SelectorMissing(".a-price-whole".into())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ExtractionError::Navigation("unreachable".into()))
            }
            Step::LaunchFailure => Err(ExtractionError::BrowserLaunch("no chrome".into())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailTransport for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("535 authentication failed".into()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Memory store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryMonitorStore,
    pub fail_saves_for: Mutex<Vec<ObjectId>>,
    pub saves: AtomicUsize,
}

#[async_trait]
impl MonitorStore for FlakyStore {
    async fn find_all(&self) -> Result<Vec<Monitor>, StoreError> {
        self.inner.find_all().await
    }

    async fn find_by_owner(&self, user_id: ObjectId) -> Result<Vec<Monitor>, StoreError> {
        self.inner.find_by_owner(user_id).await
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Monitor>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, monitor: &Monitor) -> Result<(), StoreError> {
        self.inner.insert(monitor).await
    }

    async fn save(&self, monitor: &Monitor) -> Result<Monitor, StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves_for.lock().unwrap().contains(&monitor.id) {
            return Err(StoreError::Backend("write concern error".into()));
        }
        self.inner.save(monitor).await
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<bool, StoreError> {
        self.inner.delete_by_id(id).await
    }
}

pub struct Harness {
    pub state: AppState,
    pub extractor: Arc<ScriptedExtractor>,
    pub mailer: Arc<RecordingMailer>,
    pub store: Arc<FlakyStore>,
}

pub fn test_settings() -> Settings {
    Settings {
        jwt_secret: "test-secret".to_string(),
        extract_timeout: Duration::from_millis(200),
        ..Settings::default()
    }
}

pub fn harness() -> Harness {
    let extractor = Arc::new(ScriptedExtractor::default());
    let mailer = Arc::new(RecordingMailer::default());
    let store = Arc::new(FlakyStore::default());

    let state = AppState::new(test_settings(), store.clone(), extractor.clone(), mailer.clone());

    Harness {
        state,
        extractor,
        mailer,
        store,
    }
}

impl Harness {
    pub fn token_for(&self, owner: &ObjectId) -> String {
        self.state.identity.issue(owner, 5).unwrap()
    }

    pub async fn monitor(&self, id: ObjectId) -> Monitor {
        self.store.inner.find_by_id(id).await.unwrap().expect("monitor exists")
    }
}
