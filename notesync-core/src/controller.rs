//! Load and save around best-effort sync.
//!
//! Sync is advisory here: whatever the outcome of the pass, the local
//! operation completes and the UI is told about the resulting local state.

use crate::messaging::{LifecycleMessage, MessagingSink};
use crate::sync::{Collection, SyncOrchestrator, SyncOutcome};
use crate::sync::models::PlainContent;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Id of the single note this controller edits, unless configured otherwise.
pub const DEFAULT_NOTE_ID: &str = "singleNote";

pub struct NoteController {
    collection: Collection,
    orchestrator: SyncOrchestrator,
    sink: Arc<dyn MessagingSink>,
    recipient: String,
    note_id: String,
}

impl NoteController {
    pub fn new(
        collection: Collection,
        orchestrator: SyncOrchestrator,
        sink: Arc<dyn MessagingSink>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            collection,
            orchestrator,
            sink,
            recipient: recipient.into(),
            note_id: DEFAULT_NOTE_ID.to_string(),
        }
    }

    pub fn with_note_id(mut self, note_id: impl Into<String>) -> Self {
        self.note_id = note_id.into();
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Run one sync pass without any lifecycle messages.
    pub async fn sync(&self) -> SyncOutcome {
        self.orchestrator.sync(&self.collection).await
    }

    /// Sync, then report the local note with a single `kinto-loaded` message.
    pub async fn load(&self) -> Result<()> {
        self.best_effort_sync("load").await;

        let (data, last_modified) = match self.collection.get_any(&self.note_id).await? {
            Some(record) => (Some(record.content), record.last_modified),
            None => (None, None),
        };
        self.sink.send(
            &self.recipient,
            LifecycleMessage::KintoLoaded {
                data,
                last_modified,
            },
        );
        Ok(())
    }

    /// Store new content locally, then sync.
    ///
    /// Emits `text-editing`, `text-saved` and `text-synced`, in that order,
    /// whether or not the sync pass succeeds.
    pub async fn save(&self, content: PlainContent) -> Result<()> {
        self.sink.send(&self.recipient, LifecycleMessage::TextEditing);
        self.collection.upsert(&self.note_id, content).await?;
        self.sink.send(&self.recipient, LifecycleMessage::TextSaved);

        self.best_effort_sync("save").await;

        let last_modified = self
            .collection
            .get_any(&self.note_id)
            .await?
            .and_then(|record| record.last_modified);
        self.sink
            .send(&self.recipient, LifecycleMessage::TextSynced { last_modified });
        Ok(())
    }

    async fn best_effort_sync(&self, operation: &str) {
        match self.orchestrator.sync(&self.collection).await {
            SyncOutcome::Synced(report) => {
                debug!(operation, pulled = report.pulled, pushed = report.pushed, "Sync finished")
            }
            SyncOutcome::UnauthorizedRecovered => {
                debug!(operation, "Sync skipped until credentials are renewed")
            }
            SyncOutcome::Failed(e) => warn!(operation, error = %e, "Sync failed, continuing locally"),
        }
    }
}
