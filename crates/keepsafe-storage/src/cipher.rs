use std::fmt;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::key_store::{Key, KEY_LEN};

/// Leading byte of every token; also bound into the tag as associated data.
const TOKEN_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + NONCE_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("malformed key: expected 32 bytes, got {len}")]
    MalformedKey { len: usize },
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    /// Wrong key, corrupted or tampered token, or input that is not a token.
    #[error("cannot decrypt")]
    DecryptionFailed,
}

/// AES-256-GCM over password strings.
///
/// Tokens are `base64url(version || nonce || ciphertext+tag)` with a fresh
/// random nonce per call, so they carry everything needed for decryption
/// except the key.
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    pub fn new(key: &Key) -> Result<Self, CipherError> {
        if key.len() != KEY_LEN {
            return Err(CipherError::MalformedKey { len: key.len() });
        }
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| CipherError::MalformedKey { len: key.len() })?;
        Ok(Self { cipher })
    }

    /// Encrypt a password. The empty string maps to the empty token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &[TOKEN_VERSION],
                },
            )
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut raw = Vec::with_capacity(HEADER_LEN + sealed.len());
        raw.push(TOKEN_VERSION);
        raw.extend_from_slice(nonce.as_slice());
        raw.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Decrypt a token produced by [`encrypt`](Self::encrypt) under the same key.
    pub fn decrypt(&self, token: &str) -> Result<Zeroizing<String>, CipherError> {
        if token.is_empty() {
            return Ok(Zeroizing::new(String::new()));
        }

        let raw = URL_SAFE_NO_PAD.decode(token).map_err(|e| {
            debug!(error = %e, "token is not valid base64");
            CipherError::DecryptionFailed
        })?;
        if raw.len() < HEADER_LEN + TAG_LEN {
            debug!(len = raw.len(), "token too short");
            return Err(CipherError::DecryptionFailed);
        }
        if raw[0] != TOKEN_VERSION {
            debug!(version = raw[0], "unsupported token version");
            return Err(CipherError::DecryptionFailed);
        }

        let nonce = Nonce::from_slice(&raw[1..HEADER_LEN]);
        let opened = self
            .cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &raw[HEADER_LEN..],
                    aad: &[TOKEN_VERSION],
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| {
                debug!("authentication tag mismatch");
                CipherError::DecryptionFailed
            })?;

        let text = std::str::from_utf8(&opened).map_err(|_| {
            debug!("decrypted payload is not utf-8");
            CipherError::DecryptionFailed
        })?;
        Ok(Zeroizing::new(text.to_owned()))
    }
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}
