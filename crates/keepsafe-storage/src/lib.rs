//! Concrete storage implementations with encryption at rest.
//! Uses AES-GCM with a key persisted in a local key file (or test doubles),
//! and SQLite for the credential table.

pub mod cipher;
pub mod key_store;
pub mod sqlite_store;
