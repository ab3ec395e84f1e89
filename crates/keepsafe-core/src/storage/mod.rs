mod repository;

pub use repository::{CredentialRepository, InMemoryCredentialRepository, StoreError};
