//! Sync data models: note content, wire envelopes and record state.

use crate::DatabaseError;
use serde::{Deserialize, Serialize};

/// A unit of rich-text change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub insert: String,
}

impl Delta {
    pub fn insert(text: impl Into<String>) -> Self {
        Self {
            insert: text.into(),
        }
    }
}

/// Decrypted note body: an ordered sequence of deltas.
///
/// Always serializes as `{"ops": [...]}`. Use [`ContentShape`] to read
/// payloads that may be in the legacy bare-sequence shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainContent {
    pub ops: Vec<Delta>,
}

impl PlainContent {
    pub fn new(ops: Vec<Delta>) -> Self {
        Self { ops }
    }

    /// Content consisting of a single text insert.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            ops: vec![Delta::insert(text)],
        }
    }

    /// Concatenation of every insert, in order.
    pub fn to_plain_text(&self) -> String {
        self.ops.iter().map(|d| d.insert.as_str()).collect()
    }
}

/// The two wire shapes a decrypted note payload can take.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ContentShape {
    /// Current shape: `{"ops": [...]}`.
    Ops { ops: Vec<Delta> },
    /// Legacy shape: a bare `[...]` of deltas.
    Legacy(Vec<Delta>),
}

impl From<ContentShape> for PlainContent {
    fn from(shape: ContentShape) -> Self {
        match shape {
            ContentShape::Ops { ops } => PlainContent { ops },
            ContentShape::Legacy(ops) => PlainContent { ops },
        }
    }
}

/// Identifier of the key a record was encrypted under.
///
/// Opaque: only equality is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(kid: impl Into<String>) -> Self {
        Self(kid.into())
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypted-at-rest representation of a note body.
///
/// `content` is base64 of `nonce(12) || ciphertext || auth_tag(16)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub content: String,
    pub kid: KeyId,
}

/// A record as stored by the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(flatten)]
    pub envelope: EncryptedEnvelope,
    /// Assigned by the remote store on write (epoch milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

/// Sync state of a local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Never pushed to the remote store.
    Created,
    /// Local edits not yet pushed.
    Updated,
    Synced,
}

impl SyncState {
    /// Convert sync state to its string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Synced => "synced",
        }
    }

    /// Parse a sync state from its string representation.
    pub fn parse(s: &str) -> Result<Self, DatabaseError> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "synced" => Ok(Self::Synced),
            other => Err(DatabaseError::Serialization(format!(
                "Unknown sync state {:?}",
                other
            ))),
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::Synced)
    }
}

/// A note as held in the local collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    pub content: PlainContent,
    /// Remote timestamp of the version this record was last reconciled
    /// with. `None` until the first successful sync.
    pub last_modified: Option<i64>,
    pub status: SyncState,
}

/// Per-collection sync bookkeeping kept next to the local records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// Highest remote `last_modified` seen by a pull.
    pub collection_timestamp: Option<i64>,
    /// Unix timestamp (seconds) of the last successful pass.
    pub last_sync_at: Option<i64>,
}
