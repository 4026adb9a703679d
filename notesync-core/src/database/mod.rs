//! Local record store.
//!
//! The collection keeps the decrypted notes and their sync bookkeeping
//! here. Two implementations are provided: SQLite for persistence and an
//! in-memory map for tests and ephemeral use.

pub mod memory;
pub mod schema;

pub use memory::MemoryStore;
pub use schema::SqliteStore;

use crate::sync::models::{NoteRecord, SyncMetadata};
use crate::Result;
use async_trait::async_trait;

/// Storage for local note records.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<NoteRecord>>;

    /// Insert or replace a record.
    async fn put(&self, record: &NoteRecord) -> Result<()>;

    /// Records with local changes not yet pushed.
    async fn list_pending(&self) -> Result<Vec<NoteRecord>>;

    async fn sync_metadata(&self) -> Result<SyncMetadata>;

    async fn save_sync_metadata(&self, metadata: &SyncMetadata) -> Result<()>;
}
