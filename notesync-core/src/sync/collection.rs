//! Local note collection and its pull-merge-push cycle.

use crate::crypto::RecordTransform;
use crate::database::LocalStore;
use crate::sync::conflict::ConflictResolver;
use crate::sync::models::{NoteRecord, PlainContent, RemoteRecord, SyncState};
use crate::sync::remote::{RemoteError, RemoteStore, WriteGuard};
use crate::Result;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a sync pass needs from the credentials: the record transform and
/// the bearer token for the remote store.
pub struct SyncSession<'a> {
    pub transform: &'a dyn RecordTransform,
    pub access_token: &'a str,
}

/// A remote record that could not be decoded and was left out of the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// Statistics for one pull-merge-push cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Remote records written into the local store.
    pub pulled: usize,
    /// Local records accepted by the remote store.
    pub pushed: usize,
    /// Ids whose local and remote edits were merged.
    pub conflicts: Vec<String>,
    /// Remote records that failed to decode.
    pub skipped: Vec<SkippedRecord>,
    /// Ids the remote store refused because they changed concurrently.
    pub rejected: Vec<String>,
    /// Collection timestamp after the pull.
    pub collection_timestamp: Option<i64>,
}

/// Local collection of notes mirrored to a remote collection.
pub struct Collection {
    name: String,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            remote,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    /// Write new content for `id`, marking it as a pending local change.
    ///
    /// The remote `last_modified` of the previous version is kept so the
    /// next push can detect concurrent remote writes.
    pub async fn upsert(&self, id: &str, content: PlainContent) -> Result<NoteRecord> {
        let record = match self.store.get(id).await? {
            Some(existing) => NoteRecord {
                id: id.to_string(),
                content,
                last_modified: existing.last_modified,
                status: match existing.status {
                    SyncState::Created => SyncState::Created,
                    _ => SyncState::Updated,
                },
            },
            None => NoteRecord {
                id: id.to_string(),
                content,
                last_modified: None,
                status: SyncState::Created,
            },
        };
        self.store.put(&record).await?;
        Ok(record)
    }

    /// Read the local record for `id`, whatever its sync state.
    pub async fn get_any(&self, id: &str) -> Result<Option<NoteRecord>> {
        self.store.get(id).await
    }

    /// Pull remote changes, merge them into the local store, then push
    /// pending local changes.
    pub async fn sync(&self, session: &SyncSession<'_>) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        self.pull(session, &mut report).await?;
        self.push(session, &mut report).await?;
        Ok(report)
    }

    async fn pull(&self, session: &SyncSession<'_>, report: &mut SyncReport) -> Result<()> {
        let mut metadata = self.store.sync_metadata().await?;
        let page = self
            .remote
            .list_records(session.access_token, metadata.collection_timestamp)
            .await?;

        debug!(
            collection = %self.name,
            count = page.records.len(),
            "Pulled remote records"
        );

        // Every record is decoded before any of them is merged.
        let decoded = join_all(page.records.iter().map(|record| async move {
            (record, session.transform.decode(&record.envelope).await)
        }))
        .await;

        let mut newest = metadata.collection_timestamp;
        for (remote, result) in decoded {
            match result {
                Ok(content) => {
                    self.apply_remote(remote, content, report).await?;
                    newest = newest.max(remote.last_modified);
                }
                Err(e) => {
                    warn!(id = %remote.id, error = %e, "Skipping remote record");
                    report.skipped.push(SkippedRecord {
                        id: remote.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Skipped records must be fetched again once a usable key is held.
        if report.skipped.is_empty() {
            newest = newest.max(page.timestamp);
            if newest != metadata.collection_timestamp {
                metadata.collection_timestamp = newest;
                self.store.save_sync_metadata(&metadata).await?;
            }
        }
        report.collection_timestamp = metadata.collection_timestamp;
        Ok(())
    }

    async fn apply_remote(
        &self,
        remote: &RemoteRecord,
        content: PlainContent,
        report: &mut SyncReport,
    ) -> Result<()> {
        let local = self.store.get(&remote.id).await?;

        let record = match local {
            Some(local) if local.status.is_pending() => {
                if local.last_modified.is_some() && local.last_modified == remote.last_modified {
                    // Remote has not moved since our base version
                    debug!(id = %remote.id, "Local change is ahead of remote");
                    return Ok(());
                }
                if local.content == content {
                    NoteRecord {
                        status: SyncState::Synced,
                        last_modified: remote.last_modified,
                        ..local
                    }
                } else {
                    debug!(id = %remote.id, "Resolving conflicting edits");
                    report.conflicts.push(remote.id.clone());
                    NoteRecord {
                        content: ConflictResolver::resolve(&local.content, &content),
                        last_modified: remote.last_modified,
                        status: SyncState::Updated,
                        ..local
                    }
                }
            }
            _ => NoteRecord {
                id: remote.id.clone(),
                content,
                last_modified: remote.last_modified,
                status: SyncState::Synced,
            },
        };

        self.store.put(&record).await?;
        report.pulled += 1;
        Ok(())
    }

    async fn push(&self, session: &SyncSession<'_>, report: &mut SyncReport) -> Result<()> {
        for record in self.store.list_pending().await? {
            let envelope = session.transform.encode(&record.content).await?;
            let guard = match record.last_modified {
                Some(ts) => WriteGuard::IfMatch(ts),
                None => WriteGuard::Create,
            };
            let outgoing = RemoteRecord {
                id: record.id.clone(),
                envelope,
                last_modified: record.last_modified,
            };

            match self
                .remote
                .put_record(session.access_token, &outgoing, guard)
                .await
            {
                Ok(stored) => {
                    self.store
                        .put(&NoteRecord {
                            last_modified: stored.last_modified,
                            status: SyncState::Synced,
                            ..record
                        })
                        .await?;
                    report.pushed += 1;
                }
                Err(RemoteError::PreconditionFailed(id)) => {
                    warn!(id = %id, "Remote changed during push, will retry next sync");
                    report.rejected.push(id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
