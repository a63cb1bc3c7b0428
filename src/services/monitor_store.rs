use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::FindOptions,
    Collection, Database,
};

use crate::{error::StoreError, models::Monitor};

pub const MONITORS: &str = "monitors";

/// Persistence contract the engine relies on.
///
/// `save` replaces an existing record and never creates one: if the monitor
/// was deleted in the meantime it returns [`StoreError::NotFound`].
#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Monitor>, StoreError>;

    /// Owner's monitors, most recently checked first.
    async fn find_by_owner(&self, user_id: ObjectId) -> Result<Vec<Monitor>, StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Monitor>, StoreError>;

    async fn insert(&self, monitor: &Monitor) -> Result<(), StoreError>;

    async fn save(&self, monitor: &Monitor) -> Result<Monitor, StoreError>;

    async fn delete_by_id(&self, id: ObjectId) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct MongoMonitorStore {
    db: Database,
}

impl MongoMonitorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn col(&self) -> Collection<Monitor> {
        self.db.collection::<Monitor>(MONITORS)
    }
}

#[async_trait]
impl MonitorStore for MongoMonitorStore {
    async fn find_all(&self) -> Result<Vec<Monitor>, StoreError> {
        let mut cursor = self.col().find(doc! {}, None).await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }
        Ok(items)
    }

    async fn find_by_owner(&self, user_id: ObjectId) -> Result<Vec<Monitor>, StoreError> {
        let find_opts = FindOptions::builder()
            .sort(doc! { "last_checked": -1 })
            .build();

        let mut cursor = self
            .col()
            .find(doc! { "user_id": user_id }, find_opts)
            .await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }
        Ok(items)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Monitor>, StoreError> {
        Ok(self.col().find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert(&self, monitor: &Monitor) -> Result<(), StoreError> {
        self.col().insert_one(monitor, None).await?;
        Ok(())
    }

    async fn save(&self, monitor: &Monitor) -> Result<Monitor, StoreError> {
        let res = self
            .col()
            .replace_one(doc! { "_id": monitor.id }, monitor, None)
            .await?;

        if res.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(monitor.clone())
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<bool, StoreError> {
        let res = self.col().delete_one(doc! { "_id": id }, None).await?;
        Ok(res.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

/// In-process store with the same contract, for tests and local runs.
#[derive(Default)]
pub struct MemoryMonitorStore {
    items: Mutex<Vec<Monitor>>,
}

impl MemoryMonitorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Monitor>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Backend("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl MonitorStore for MemoryMonitorStore {
    async fn find_all(&self) -> Result<Vec<Monitor>, StoreError> {
        Ok(self.lock()?.clone())
    }

    async fn find_by_owner(&self, user_id: ObjectId) -> Result<Vec<Monitor>, StoreError> {
        let mut items: Vec<Monitor> = self
            .lock()?
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.last_checked.cmp(&a.last_checked));
        Ok(items)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Monitor>, StoreError> {
        Ok(self.lock()?.iter().find(|m| m.id == id).cloned())
    }

    async fn insert(&self, monitor: &Monitor) -> Result<(), StoreError> {
        let mut items = self.lock()?;
        if items.iter().any(|m| m.id == monitor.id) {
            return Err(StoreError::Backend("duplicate key".to_string()));
        }
        items.push(monitor.clone());
        Ok(())
    }

    async fn save(&self, monitor: &Monitor) -> Result<Monitor, StoreError> {
        let mut items = self.lock()?;
        let slot = items
            .iter_mut()
            .find(|m| m.id == monitor.id)
            .ok_or(StoreError::NotFound)?;
        *slot = monitor.clone();
        Ok(monitor.clone())
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut items = self.lock()?;
        let before = items.len();
        items.retain(|m| m.id != id);
        Ok(items.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(owner: ObjectId, checked: i64) -> Monitor {
        Monitor::new(
            owner,
            "https://shop.example/p".into(),
            "a@example.com".into(),
            10.0,
            12.0,
            checked,
        )
    }

    #[tokio::test]
    async fn save_does_not_resurrect_deleted_monitor() {
        let store = MemoryMonitorStore::new();
        let m = monitor(ObjectId::new(), 1);
        store.insert(&m).await.unwrap();

        assert!(store.delete_by_id(m.id).await.unwrap());
        assert!(matches!(store.save(&m).await, Err(StoreError::NotFound)));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_owner_filters_and_sorts_newest_first() {
        let store = MemoryMonitorStore::new();
        let alice = ObjectId::new();
        let bob = ObjectId::new();

        let older = monitor(alice, 10);
        let newer = monitor(alice, 20);
        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();
        store.insert(&monitor(bob, 30)).await.unwrap();

        let mine = store.find_by_owner(alice).await.unwrap();
        let ids: Vec<ObjectId> = mine.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn delete_missing_reports_false() {
        let store = MemoryMonitorStore::new();
        assert!(!store.delete_by_id(ObjectId::new()).await.unwrap());
    }
}
