//! In-memory record store.

use crate::database::LocalStore;
use crate::sync::models::{NoteRecord, SyncMetadata};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, NoteRecord>>,
    metadata: Mutex<SyncMetadata>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<NoteRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn put(&self, record: &NoteRecord) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<NoteRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.status.is_pending())
            .cloned()
            .collect())
    }

    async fn sync_metadata(&self) -> Result<SyncMetadata> {
        Ok(self.metadata.lock().await.clone())
    }

    async fn save_sync_metadata(&self, metadata: &SyncMetadata) -> Result<()> {
        *self.metadata.lock().await = metadata.clone();
        Ok(())
    }
}
