//! Sync orchestrator: one credential-scoped pass over a collection.

use crate::credentials::CredentialManager;
use crate::crypto::CryptoTransform;
use crate::sync::collection::{Collection, SyncReport, SyncSession};
use crate::{NoteSyncError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// How a sync invocation ended.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The pass completed.
    Synced(SyncReport),
    /// The remote store rejected the access token. Credentials were
    /// cleared; the next invocation will acquire new ones.
    UnauthorizedRecovered,
    /// Any other failure.
    Failed(NoteSyncError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    /// `Synced` → `Ok(Some)`, `UnauthorizedRecovered` → `Ok(None)`,
    /// `Failed` → `Err`.
    pub fn into_result(self) -> Result<Option<SyncReport>> {
        match self {
            Self::Synced(report) => Ok(Some(report)),
            Self::UnauthorizedRecovered => Ok(None),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Runs sync passes with credentials from a [`CredentialManager`].
pub struct SyncOrchestrator {
    credentials: Arc<dyn CredentialManager>,
}

impl SyncOrchestrator {
    pub fn new(credentials: Arc<dyn CredentialManager>) -> Self {
        Self { credentials }
    }

    /// Perform one sync pass.
    ///
    /// A 401 from the remote store clears the credentials exactly once and
    /// is reported as [`SyncOutcome::UnauthorizedRecovered`]; the same
    /// credentials are never retried within this call.
    pub async fn sync(&self, collection: &Collection) -> SyncOutcome {
        match self.run(collection).await {
            Ok(report) => {
                info!(
                    collection = collection.name(),
                    pulled = report.pulled,
                    pushed = report.pushed,
                    conflicts = report.conflicts.len(),
                    skipped = report.skipped.len(),
                    "Sync completed"
                );
                SyncOutcome::Synced(report)
            }
            Err(e) if e.is_unauthorized() => {
                info!(collection = collection.name(), "Access token rejected, clearing credentials");
                if let Err(clear_err) = self.credentials.clear().await {
                    warn!(error = %clear_err, "Failed to clear credentials");
                }
                SyncOutcome::UnauthorizedRecovered
            }
            Err(e) => {
                warn!(collection = collection.name(), error = %e, "Sync failed");
                SyncOutcome::Failed(e)
            }
        }
    }

    async fn run(&self, collection: &Collection) -> Result<SyncReport> {
        let credentials = self.credentials.get().await?;
        let transform = CryptoTransform::from_content_key(&credentials.key)?;

        let session = SyncSession {
            transform: &transform,
            access_token: &credentials.access_token,
        };
        let report = collection.sync(&session).await?;

        let store = collection.store();
        let mut metadata = store.sync_metadata().await?;
        metadata.last_sync_at = Some(chrono::Utc::now().timestamp());
        store.save_sync_metadata(&metadata).await?;

        Ok(report)
    }
}
