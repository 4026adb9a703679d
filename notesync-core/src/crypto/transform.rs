//! Record transform: note content <-> encrypted envelope.
//!
//! The transform is the only place where ciphertext is produced or read.
//! It holds exactly one key; a record encrypted under any other key id is
//! rejected with [`CryptoError::StaleKey`] before any decryption happens.

use crate::credentials::ContentKey;
use crate::crypto::cipher::{open, seal, NoteKey};
use crate::crypto::{CryptoError, Result};
use crate::sync::models::{ContentShape, EncryptedEnvelope, KeyId, PlainContent};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

/// Encoding hook applied by the collection to every record it pushes or pulls.
#[async_trait]
pub trait RecordTransform: Send + Sync {
    /// Encrypt a note body into an envelope.
    async fn encode(&self, content: &PlainContent) -> Result<EncryptedEnvelope>;

    /// Decrypt an envelope back into a note body.
    async fn decode(&self, envelope: &EncryptedEnvelope) -> Result<PlainContent>;
}

/// AES-256-GCM record transform bound to a single key.
#[derive(Debug, Clone)]
pub struct CryptoTransform {
    kid: KeyId,
    key: NoteKey,
}

impl CryptoTransform {
    pub fn new(kid: KeyId, key: NoteKey) -> Self {
        Self { kid, key }
    }

    /// Build a transform from the key carried in the credentials.
    pub fn from_content_key(key: &ContentKey) -> Result<Self> {
        if key.kty != "oct" {
            return Err(CryptoError::InvalidKey(format!(
                "Unsupported key type: {}",
                key.kty
            )));
        }
        Ok(Self {
            kid: key.kid.clone(),
            key: NoteKey::from_jwk_secret(&key.k)?,
        })
    }

    /// Key id of the held key.
    pub fn kid(&self) -> &KeyId {
        &self.kid
    }

    fn encode_sync(&self, content: &PlainContent) -> Result<EncryptedEnvelope> {
        let plaintext =
            serde_json::to_vec(content).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        let sealed = seal(&self.key, &plaintext)?;

        Ok(EncryptedEnvelope {
            content: STANDARD.encode(sealed),
            kid: self.kid.clone(),
        })
    }

    fn decode_sync(&self, envelope: &EncryptedEnvelope) -> Result<PlainContent> {
        if envelope.kid != self.kid {
            return Err(CryptoError::StaleKey {
                expected: self.kid.clone(),
                found: envelope.kid.clone(),
            });
        }

        let sealed = STANDARD
            .decode(&envelope.content)
            .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid envelope: {}", e)))?;
        let plaintext = open(&self.key, &sealed)?;

        let shape: ContentShape = serde_json::from_slice(&plaintext)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(shape.into())
    }
}

#[async_trait]
impl RecordTransform for CryptoTransform {
    async fn encode(&self, content: &PlainContent) -> Result<EncryptedEnvelope> {
        self.encode_sync(content)
    }

    async fn decode(&self, envelope: &EncryptedEnvelope) -> Result<PlainContent> {
        self.decode_sync(envelope)
    }
}
