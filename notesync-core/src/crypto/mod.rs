//! Cryptographic primitives for note sync.
//!
//! This module provides:
//! - AES-256-GCM sealing of note payloads
//! - The record transform that turns note content into encrypted
//!   envelopes and back, enforcing the key id

pub mod cipher;
pub mod transform;

pub use cipher::{open, seal, NoteKey};
pub use transform::{CryptoTransform, RecordTransform};

use crate::sync::models::KeyId;
use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Record encrypted under key {found}, but the held key is {expected}")]
    StaleKey { expected: KeyId, found: KeyId },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("Authentication failed - data may have been tampered with")]
    AuthenticationFailed,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
