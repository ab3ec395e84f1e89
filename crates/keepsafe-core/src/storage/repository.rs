use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;

use crate::credentials::{CredentialRecord, NewCredential};

/// Errors produced by credential repositories.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying persistence failure (disk, permissions, corruption).
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Persistence contract for credential records.
///
/// Implementations assign ids, keep every operation atomic, and hand out
/// owned copies so later deletes never invalidate previously returned data.
pub trait CredentialRepository: Send + Sync {
    /// Persist a record and return its newly assigned id.
    fn insert(&self, credential: &NewCredential) -> Result<i64, StoreError>;

    /// All records, newest id first.
    fn fetch_all(&self) -> Result<Vec<CredentialRecord>, StoreError>;

    /// Look up a single record.
    fn find_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, StoreError>;

    /// Remove a record (idempotent). Returns whether a row was removed.
    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<CredentialRecord>,
    last_id: i64,
}

/// In-memory repository for tests and ephemeral sessions.
/// Ids come from a counter that only moves forward, matching the
/// no-reuse guarantee of the on-disk store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

impl CredentialRepository for InMemoryCredentialRepository {
    fn insert(&self, credential: &NewCredential) -> Result<i64, StoreError> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        let id = inner.last_id;
        inner.records.push(CredentialRecord {
            id,
            website: credential.website.clone(),
            username: credential.username.clone(),
            ciphertext: credential.ciphertext.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn fetch_all(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let inner = self.lock()?;
        let mut records = inner.records.clone();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        Ok(inner.records.len() != before)
    }
}
