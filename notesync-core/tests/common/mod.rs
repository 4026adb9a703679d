//! Shared fakes for the sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use notesync_core::sync::{RemotePage, WriteGuard};
use notesync_core::{
    Collection, ContentKey, Credentials, CryptoTransform, InMemoryCredentials, KeyId,
    MemoryStore, PlainContent, RecordTransform, RemoteError, RemoteRecord, RemoteStore,
    SyncOrchestrator,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NOTE_ID: &str = "singleNote";

/// How every call to the fake remote should fail, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    Unauthorized,
    Transport,
}

/// In-memory remote collection with Kinto-like timestamps and guards.
pub struct FakeRemote {
    records: Mutex<BTreeMap<String, RemoteRecord>>,
    clock: AtomicI64,
    failure: Mutex<Failure>,
    put_failure: Mutex<Failure>,
    pub list_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub guards: Mutex<Vec<WriteGuard>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            clock: AtomicI64::new(1000),
            failure: Mutex::new(Failure::None),
            put_failure: Mutex::new(Failure::None),
            list_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            guards: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_with(&self, failure: Failure) {
        *self.failure.lock().unwrap() = failure;
    }

    /// Store a record as if another device had written it.
    pub fn seed(&self, mut record: RemoteRecord) -> i64 {
        let ts = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        record.last_modified = Some(ts);
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
        ts
    }

    pub fn get(&self, id: &str) -> Option<RemoteRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    /// Fail only writes; listing keeps working.
    pub fn fail_puts_with(&self, failure: Failure) {
        *self.put_failure.lock().unwrap() = failure;
    }

    fn check_failure(&self) -> Result<(), RemoteError> {
        Self::raise(*self.failure.lock().unwrap())
    }

    fn raise(failure: Failure) -> Result<(), RemoteError> {
        match failure {
            Failure::None => Ok(()),
            Failure::Unauthorized => Err(RemoteError::Unauthorized),
            Failure::Transport => Err(RemoteError::Transport("connection reset".to_string())),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list_records(
        &self,
        _access_token: &str,
        since: Option<i64>,
    ) -> Result<RemotePage, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let mut records: Vec<RemoteRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| since.map_or(true, |since| r.last_modified > Some(since)))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

        Ok(RemotePage {
            records,
            timestamp: Some(self.clock.load(Ordering::SeqCst)),
        })
    }

    async fn put_record(
        &self,
        _access_token: &str,
        record: &RemoteRecord,
        guard: WriteGuard,
    ) -> Result<RemoteRecord, RemoteError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Self::raise(*self.put_failure.lock().unwrap())?;
        self.guards.lock().unwrap().push(guard);

        let mut records = self.records.lock().unwrap();
        let current = records.get(&record.id).and_then(|r| r.last_modified);
        let allowed = match guard {
            WriteGuard::Create => current.is_none(),
            WriteGuard::IfMatch(ts) => current == Some(ts),
        };
        if !allowed {
            return Err(RemoteError::PreconditionFailed(record.id.clone()));
        }

        let ts = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = RemoteRecord {
            last_modified: Some(ts),
            ..record.clone()
        };
        records.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }
}

/// One device: local store, credentials and a view of a shared remote.
pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub store: Arc<MemoryStore>,
    pub credentials: Arc<InMemoryCredentials>,
    pub key: ContentKey,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_remote(Arc::new(FakeRemote::new()), ContentKey::generate(KeyId::new("k1")))
    }

    pub fn with_remote(remote: Arc<FakeRemote>, key: ContentKey) -> Self {
        let credentials = Credentials {
            key: key.clone(),
            access_token: "access-token".to_string(),
        };
        Self {
            remote,
            store: Arc::new(MemoryStore::new()),
            credentials: Arc::new(InMemoryCredentials::with_credentials(credentials)),
            key,
        }
    }

    pub fn collection(&self) -> Collection {
        Collection::new("notes", self.store.clone(), self.remote.clone())
    }

    pub fn orchestrator(&self) -> SyncOrchestrator {
        SyncOrchestrator::new(self.credentials.clone())
    }

    pub fn transform(&self) -> CryptoTransform {
        CryptoTransform::from_content_key(&self.key).unwrap()
    }

    /// Encrypt `content` under this device's key and store it remotely.
    pub async fn seed_remote(&self, id: &str, content: &PlainContent) -> i64 {
        let envelope = self.transform().encode(content).await.unwrap();
        self.remote.seed(RemoteRecord {
            id: id.to_string(),
            envelope,
            last_modified: None,
        })
    }

    /// Decrypt the remote copy of `id`.
    pub async fn remote_content(&self, id: &str) -> PlainContent {
        let record = self.remote.get(id).expect("remote record");
        self.transform().decode(&record.envelope).await.unwrap()
    }
}
