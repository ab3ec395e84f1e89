use keepsafe_core::storage::StoreError;
use keepsafe_storage::{cipher::CipherError, key_store::KeyError};
use thiserror::Error;

/// Errors surfaced to the presentation layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    /// Key file missing and not creatable, or present but unreadable.
    #[error("vault key unavailable: {0}")]
    KeyUnavailable(String),
    /// Key material exists but is not usable by the cipher.
    #[error("vault key is malformed: {0}")]
    MalformedKey(String),
    #[error("cannot decrypt password")]
    DecryptionFailed,
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("{field} must not be empty")]
    ValidationFailed { field: &'static str },
    #[error("storage failure: {0}")]
    StorageIoFailure(String),
}

impl VaultError {
    /// Key errors mean the vault cannot open at all; everything else is per call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyUnavailable(_) | Self::MalformedKey(_))
    }
}

impl From<KeyError> for VaultError {
    fn from(err: KeyError) -> Self {
        Self::KeyUnavailable(err.to_string())
    }
}

impl From<CipherError> for VaultError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::MalformedKey { .. } => Self::MalformedKey(err.to_string()),
            CipherError::EncryptionFailed(reason) => Self::EncryptionFailed(reason),
            CipherError::DecryptionFailed => Self::DecryptionFailed,
        }
    }
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Storage { reason } => Self::StorageIoFailure(reason),
        }
    }
}
