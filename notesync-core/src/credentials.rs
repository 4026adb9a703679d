//! Access credentials: the content key and the short-lived access token.
//!
//! The sync orchestrator borrows credentials for one pass through the
//! [`CredentialManager`] trait and never persists them itself.

use crate::crypto::NoteKey;
use crate::sync::models::KeyId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;

/// Credentials operation errors.
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Credentials not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Symmetric content key in JSON Web Key form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKey {
    pub kid: KeyId,
    pub kty: String,
    /// base64url-encoded 256-bit key.
    pub k: String,
}

impl ContentKey {
    /// Generate a fresh random `oct` key with the given id.
    pub fn generate(kid: KeyId) -> Self {
        Self {
            kid,
            kty: "oct".to_string(),
            k: NoteKey::generate().to_jwk_secret(),
        }
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentKey")
            .field("kid", &self.kid)
            .field("kty", &self.kty)
            .field("k", &"<redacted>")
            .finish()
    }
}

/// Content key plus the bearer token for the remote store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub key: ContentKey,
    pub access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Source of credentials for sync passes.
///
/// `clear` invalidates whatever is held so that the next `get` has to
/// obtain fresh credentials. It must succeed even if nothing is held.
#[async_trait]
pub trait CredentialManager: Send + Sync {
    async fn get(&self) -> Result<Credentials, CredentialsError>;

    async fn clear(&self) -> Result<(), CredentialsError>;
}

/// In-memory credential manager.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
    credentials: Mutex<Option<Credentials>>,
    get_calls: AtomicUsize,
    clear_calls: AtomicUsize,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
            ..Self::default()
        }
    }

    /// Replace the held credentials.
    pub async fn set(&self, credentials: Option<Credentials>) {
        *self.credentials.lock().await = credentials;
    }

    pub async fn current(&self) -> Option<Credentials> {
        self.credentials.lock().await.clone()
    }

    /// Number of `get` calls so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `clear` calls so far.
    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialManager for InMemoryCredentials {
    async fn get(&self) -> Result<Credentials, CredentialsError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.credentials
            .lock()
            .await
            .clone()
            .ok_or(CredentialsError::NotFound)
    }

    async fn clear(&self) -> Result<(), CredentialsError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        *self.credentials.lock().await = None;
        Ok(())
    }
}

/// Credential manager backed by a JSON file.
///
/// `clear` deletes the file.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write credentials to the file, creating parent directories.
    pub async fn store(&self, credentials: &Credentials) -> Result<(), CredentialsError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(credentials)
            .map_err(|e| CredentialsError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialManager for FileCredentials {
    async fn get(&self) -> Result<Credentials, CredentialsError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialsError::NotFound)
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| CredentialsError::Serialization(e.to_string()))
    }

    async fn clear(&self) -> Result<(), CredentialsError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials {
            key: ContentKey::generate(KeyId::new("k1")),
            access_token: "token-123".to_string(),
        }
    }

    #[test]
    fn debug_output_is_redacted() {
        let creds = sample();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("token-123"));
        assert!(!debug.contains(&creds.key.k));
        assert!(debug.contains("k1"));
    }

    #[tokio::test]
    async fn in_memory_get_and_clear() {
        let manager = InMemoryCredentials::with_credentials(sample());
        assert_eq!(manager.get().await.unwrap().access_token, "token-123");

        manager.clear().await.unwrap();
        assert!(matches!(manager.get().await, Err(CredentialsError::NotFound)));
        assert_eq!(manager.get_calls(), 2);
        assert_eq!(manager.clear_calls(), 1);
    }

    #[tokio::test]
    async fn in_memory_clear_without_credentials() {
        let manager = InMemoryCredentials::new();
        assert!(manager.clear().await.is_ok());
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn file_store_get_clear() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FileCredentials::new(dir.path().join("nested").join("credentials.json"));

        assert!(matches!(manager.get().await, Err(CredentialsError::NotFound)));

        let creds = sample();
        manager.store(&creds).await.unwrap();
        assert_eq!(manager.get().await.unwrap(), creds);

        manager.clear().await.unwrap();
        assert!(!manager.path().exists());
        // Clearing twice is fine
        manager.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_with_garbage_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"not json").unwrap();

        let manager = FileCredentials::new(path);
        assert!(matches!(
            manager.get().await,
            Err(CredentialsError::Serialization(_))
        ));
    }
}
