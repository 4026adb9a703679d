//! Encrypted Note Sync Core Library
//!
//! This library provides the synchronization pipeline for a single
//! end-to-end encrypted note, including the record transform, the
//! conflict policy, the sync orchestrator and the load/save controllers.

pub mod config;
pub mod controller;
pub mod credentials;
pub mod crypto;
pub mod database;
pub mod messaging;
pub mod platform;
pub mod sync;

pub use config::SyncConfig;
pub use controller::NoteController;
pub use credentials::{
    ContentKey, CredentialManager, Credentials, CredentialsError, FileCredentials,
    InMemoryCredentials,
};
pub use crypto::{CryptoError, CryptoTransform, RecordTransform};
pub use database::{LocalStore, MemoryStore, SqliteStore};
pub use messaging::{ChannelSink, LifecycleMessage, MessagingSink, NativeMessagingSink};
pub use sync::{
    Collection, ConflictResolver, RemoteError, RemoteStore, SyncOrchestrator, SyncOutcome,
    SyncReport,
};
pub use sync::models::{Delta, EncryptedEnvelope, KeyId, NoteRecord, PlainContent, RemoteRecord};

use thiserror::Error;

/// Result type for note sync operations
pub type Result<T> = std::result::Result<T, NoteSyncError>;

/// Errors raised by the local record store
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage task failed: {0}")]
    TaskFailed(String),
}

/// General error type for note sync operations
#[derive(Error, Debug)]
pub enum NoteSyncError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Remote error: {0}")]
    Remote(#[from] sync::RemoteError),

    #[error("Credentials error: {0}")]
    Credentials(#[from] credentials::CredentialsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NoteSyncError {
    /// Whether this error is the remote store rejecting the access token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Remote(sync::RemoteError::Unauthorized))
    }
}
