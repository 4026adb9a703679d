//! AES-256-GCM sealing and opening of note payloads.
//!
//! Uses AES-256-GCM with:
//! - 256-bit key
//! - 96-bit (12 byte) nonce, freshly generated for every seal
//! - 128-bit authentication tag
//!
//! The sealed wire format is `nonce(12) || ciphertext || auth_tag(16)`.

use crate::crypto::{CryptoError, Result};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use zeroize::Zeroize;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// The symmetric key notes are encrypted under.
///
/// Never persisted by this crate; it is derived from the credentials
/// for the duration of one sync pass.
#[derive(Clone)]
pub struct NoteKey {
    key: [u8; KEY_LEN],
}

impl NoteKey {
    /// Generate a new random note key
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        Self { key: key.into() }
    }

    /// Parse the base64url `k` member of an `oct` JSON Web Key.
    pub fn from_jwk_secret(k: &str) -> Result<Self> {
        let mut decoded = URL_SAFE_NO_PAD
            .decode(k.trim_end_matches('='))
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid key encoding: {}", e)))?;

        if decoded.len() != KEY_LEN {
            let got = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                got,
            });
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { key })
    }

    /// Encode the key as the base64url `k` member of a JSON Web Key.
    pub fn to_jwk_secret(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.key)
    }

    /// Get the raw key bytes (use sparingly)
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl Drop for NoteKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoteKey(..)")
    }
}

/// Encrypt `plaintext` under `key`.
///
/// Returns `nonce(12) || ciphertext || auth_tag(16)`.
pub fn seal(key: &NoteKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(CryptoError::EncryptionFailed(
            "Cannot encrypt empty payload".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let nonce_bytes: [u8; NONCE_LEN] = nonce.into();

    // aes-gcm appends the tag, so this is ciphertext || tag
    let ciphertext_with_tag = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext_with_tag.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext_with_tag);

    Ok(sealed)
}

/// Decrypt a blob produced by [`seal`].
///
/// Fails without returning any plaintext if the tag does not verify.
pub fn open(key: &NoteKey, sealed: &[u8]) -> Result<Vec<u8>> {
    // 12 (nonce) + 1 (ciphertext) + 16 (tag)
    if sealed.len() < NONCE_LEN + 1 + TAG_LEN {
        return Err(CryptoError::DecryptionFailed(
            "Sealed payload too short".to_string(),
        ));
    }

    let nonce_bytes: [u8; NONCE_LEN] = sealed[..NONCE_LEN]
        .try_into()
        .map_err(|_| CryptoError::InvalidNonce("Invalid nonce length".to_string()))?;

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from(nonce_bytes);

    cipher
        .decrypt(&nonce, &sealed[NONCE_LEN..])
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = NoteKey::generate();
        let plaintext = b"{\"ops\":[{\"insert\":\"hello\"}]}";

        let sealed = seal(&key, plaintext).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + plaintext.len() + TAG_LEN);
        assert_eq!(open(&key, &sealed).unwrap(), plaintext.to_vec());
    }

    #[test]
    fn seal_empty_fails() {
        let key = NoteKey::generate();
        assert!(seal(&key, b"").is_err());
    }

    #[test]
    fn open_too_short_fails() {
        let key = NoteKey::generate();
        assert!(open(&key, &[0u8; NONCE_LEN + TAG_LEN]).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&NoteKey::generate(), b"secret note").unwrap();
        assert!(matches!(
            open(&NoteKey::generate(), &sealed),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn tampered_payload_fails() {
        let key = NoteKey::generate();
        let mut sealed = seal(&key, b"secret note").unwrap();
        sealed[NONCE_LEN + 2] ^= 0xFF;
        assert!(open(&key, &sealed).is_err());

        let mut sealed = seal(&key, b"secret note").unwrap();
        sealed[0] ^= 0xFF;
        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn nonces_are_unique() {
        let key = NoteKey::generate();
        let a = seal(&key, b"same").unwrap();
        let b = seal(&key, b"same").unwrap();

        assert_ne!(&a[..NONCE_LEN], &b[..NONCE_LEN]);
        assert_eq!(open(&key, &a).unwrap(), open(&key, &b).unwrap());
    }

    #[test]
    fn jwk_secret_roundtrip() {
        let key = NoteKey::generate();
        let parsed = NoteKey::from_jwk_secret(&key.to_jwk_secret()).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn jwk_secret_wrong_length_rejected() {
        let short = URL_SAFE_NO_PAD.encode([7u8; 16]);
        assert!(matches!(
            NoteKey::from_jwk_secret(&short),
            Err(CryptoError::InvalidKeyLength { expected: 32, got: 16 })
        ));
        assert!(NoteKey::from_jwk_secret("not base64!").is_err());
    }
}
