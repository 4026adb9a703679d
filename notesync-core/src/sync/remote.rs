//! Remote collection abstraction.

use crate::sync::models::RemoteRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by the remote record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// HTTP 401: the access token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// HTTP 412: the record changed remotely since `If-Match`.
    #[error("Precondition failed for record {0}")]
    PreconditionFailed(String),

    #[error("Remote error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, record_id: Option<&str>, message: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            412 => Self::PreconditionFailed(record_id.unwrap_or_default().to_string()),
            _ => Self::Status { status, message },
        }
    }
}

/// Records returned by a pull, most recently modified first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePage {
    pub records: Vec<RemoteRecord>,
    /// Collection timestamp reported by the server, if any.
    pub timestamp: Option<i64>,
}

/// How a push should guard against concurrent remote writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGuard {
    /// The record must not exist remotely yet.
    Create,
    /// The remote record must still be at this `last_modified`.
    IfMatch(i64),
}

/// The remote record collection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List records modified after `since` (all when `None`),
    /// ordered by descending `last_modified`.
    async fn list_records(
        &self,
        access_token: &str,
        since: Option<i64>,
    ) -> Result<RemotePage, RemoteError>;

    /// Write a record and return it as stored, with its new `last_modified`.
    async fn put_record(
        &self,
        access_token: &str,
        record: &RemoteRecord,
        guard: WriteGuard,
    ) -> Result<RemoteRecord, RemoteError>;
}
