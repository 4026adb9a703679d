//! End-to-end encrypted note sync
//!
//! - Per-record AES-256-GCM envelopes tagged with a key id
//! - Pull (most recently modified first), merge, push with `If-Match`
//! - Remote-then-local text-append conflict resolution
//! - 401 handling by credential invalidation

#[cfg(feature = "remote")]
pub mod client;
pub mod collection;
pub mod conflict;
pub mod engine;
pub mod models;
pub mod remote;

#[cfg(feature = "remote")]
pub use client::KintoClient;
pub use collection::{Collection, SkippedRecord, SyncReport, SyncSession};
pub use conflict::{ConflictResolver, CONFLICT_DIVIDER};
pub use engine::{SyncOrchestrator, SyncOutcome};
pub use remote::{RemoteError, RemotePage, RemoteStore, WriteGuard};
