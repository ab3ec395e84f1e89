//! Core types for Keepsafe: credential records and the repository contract
//! that persistence backends implement.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod credentials;
pub mod storage;
