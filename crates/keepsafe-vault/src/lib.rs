//! Vault facade composing the credential cipher with a credential repository.
//! This is the surface the presentation layer calls; plaintext passwords only
//! exist here for the duration of an add or reveal call.

pub mod error;
pub mod generator;

use std::path::{Path, PathBuf};

use keepsafe_core::{
    credentials::{CredentialRecord, NewCredential},
    storage::CredentialRepository,
};
use keepsafe_storage::{
    cipher::CredentialCipher,
    key_store::{FileKeyStore, KeyStore},
    sqlite_store::SqliteCredentialStore,
};
use tracing::{info, instrument, warn};
use zeroize::Zeroizing;

pub use error::VaultError;

pub const DEFAULT_KEY_FILE: &str = "vault.key";
pub const DEFAULT_DATABASE_FILE: &str = "vault.db";

/// Shown in place of a password that cannot be decrypted.
pub const REVEAL_FAILED_SENTINEL: &str = "[Error]";

/// Locations of the key file and the credential database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub key_file: PathBuf,
    pub database_file: PathBuf,
}

impl VaultPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            key_file: dir.join(DEFAULT_KEY_FILE),
            database_file: dir.join(DEFAULT_DATABASE_FILE),
        }
    }
}

/// Credential vault over any `CredentialRepository`.
pub struct Vault<R: CredentialRepository> {
    cipher: CredentialCipher,
    repo: R,
}

impl Vault<SqliteCredentialStore> {
    /// Load (or create) the key file and open the SQLite store.
    /// Key failures abort here; no partially opened vault is returned.
    #[instrument(skip_all, fields(db = %paths.database_file.display()))]
    pub fn open(paths: &VaultPaths) -> Result<Self, VaultError> {
        let key = FileKeyStore::new(&paths.key_file).load_or_create()?;
        let cipher = CredentialCipher::new(&key)?;
        let repo = SqliteCredentialStore::initialize(&paths.database_file)?;
        info!("vault opened");
        Ok(Self::new(cipher, repo))
    }
}

impl<R: CredentialRepository> Vault<R> {
    pub fn new(cipher: CredentialCipher, repo: R) -> Self {
        Self { cipher, repo }
    }

    pub fn from_key_store<K: KeyStore>(key_store: &K, repo: R) -> Result<Self, VaultError> {
        let key = key_store.load_or_create()?;
        let cipher = CredentialCipher::new(&key)?;
        Ok(Self::new(cipher, repo))
    }

    /// Encrypt the password and store a new record. Website and username are
    /// trimmed; the password is kept exactly as given.
    #[instrument(skip_all)]
    pub fn add_credential(
        &self,
        website: &str,
        username: &str,
        password: &str,
    ) -> Result<i64, VaultError> {
        let website = website.trim();
        let username = username.trim();
        if website.is_empty() {
            return Err(VaultError::ValidationFailed { field: "website" });
        }
        if username.is_empty() {
            return Err(VaultError::ValidationFailed { field: "username" });
        }
        if password.is_empty() {
            return Err(VaultError::ValidationFailed { field: "password" });
        }

        let ciphertext = self.cipher.encrypt(password)?;
        let id = self
            .repo
            .insert(&NewCredential::new(website, username, ciphertext))?;
        info!(id, "credential added");
        Ok(id)
    }

    /// All records, newest first. Passwords stay encrypted.
    pub fn list_credentials(&self) -> Result<Vec<CredentialRecord>, VaultError> {
        Ok(self.repo.fetch_all()?)
    }

    /// Records whose website or username contains `query`, case-insensitively.
    pub fn search_credentials(&self, query: &str) -> Result<Vec<CredentialRecord>, VaultError> {
        let mut records = self.repo.fetch_all()?;
        records.retain(|r| r.matches(query));
        Ok(records)
    }

    pub fn find_credential(&self, id: i64) -> Result<Option<CredentialRecord>, VaultError> {
        Ok(self.repo.find_by_id(id)?)
    }

    /// Decrypt a stored token on explicit request.
    pub fn reveal_password(&self, ciphertext: &str) -> Result<Zeroizing<String>, VaultError> {
        Ok(self.cipher.decrypt(ciphertext)?)
    }

    /// Like [`reveal_password`](Self::reveal_password), rendering failures as
    /// [`REVEAL_FAILED_SENTINEL`].
    pub fn reveal_or_sentinel(&self, ciphertext: &str) -> Zeroizing<String> {
        self.reveal_password(ciphertext).unwrap_or_else(|err| {
            warn!(error = %err, "password could not be revealed");
            Zeroizing::new(REVEAL_FAILED_SENTINEL.to_string())
        })
    }

    /// Remove a record. Unknown ids are a no-op.
    #[instrument(skip(self))]
    pub fn delete_credential(&self, id: i64) -> Result<(), VaultError> {
        if self.repo.delete_by_id(id)? {
            info!("credential deleted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use keepsafe_core::storage::InMemoryCredentialRepository;
    use keepsafe_storage::key_store::{generate_key, InMemoryKeyStore};

    use super::*;

    fn memory_vault() -> Vault<InMemoryCredentialRepository> {
        Vault::from_key_store(
            &InMemoryKeyStore::default(),
            InMemoryCredentialRepository::new(),
        )
        .expect("vault")
    }

    #[test]
    fn end_to_end_add_list_reveal_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let vault = Vault::open(&VaultPaths::in_dir(dir.path())).expect("open");

        let id = vault
            .add_credential("example.com", "alice", "p@ss1")
            .expect("add");

        let listed = vault.list_credentials().expect("list");
        assert_eq!(listed.len(), 1);
        let record = &listed[0];
        assert_eq!(record.id, id);
        assert_eq!(record.website, "example.com");
        assert_eq!(record.username, "alice");
        assert!(!record.ciphertext.is_empty());
        assert_ne!(record.ciphertext, "p@ss1");

        let revealed = vault.reveal_password(&record.ciphertext).expect("reveal");
        assert_eq!(revealed.as_str(), "p@ss1");

        vault.delete_credential(id).expect("delete");
        assert!(vault.list_credentials().expect("list").is_empty());
    }

    #[test]
    fn reopening_keeps_key_and_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = VaultPaths::in_dir(dir.path());
        {
            let vault = Vault::open(&paths).expect("open");
            vault
                .add_credential("example.com", "alice", "p@ss1")
                .expect("add");
        }

        let reopened = Vault::open(&paths).expect("reopen");
        let listed = reopened.list_credentials().expect("list");
        assert_eq!(listed.len(), 1);
        let revealed = reopened
            .reveal_password(&listed[0].ciphertext)
            .expect("reveal after reopen");
        assert_eq!(revealed.as_str(), "p@ss1");
    }

    #[test]
    fn plaintext_never_reaches_the_database_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = VaultPaths::in_dir(dir.path());
        let vault = Vault::open(&paths).expect("open");
        vault
            .add_credential("example.com", "alice", "hunter2-very-unique")
            .expect("add");
        drop(vault);

        let bytes = fs::read(&paths.database_file).expect("read db");
        let needle = b"hunter2-very-unique";
        assert!(!bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn malformed_key_file_aborts_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = VaultPaths::in_dir(dir.path());
        fs::write(&paths.key_file, b"").expect("write empty key");

        let err = Vault::open(&paths).err().expect("must not open");
        assert!(matches!(err, VaultError::MalformedKey(_)));
        assert!(err.is_fatal());
        assert!(fs::read(&paths.key_file).expect("read").is_empty());
    }

    #[test]
    fn unreadable_key_file_aborts_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = VaultPaths::in_dir(dir.path());
        fs::create_dir(&paths.key_file).expect("mkdir in place of key");

        let err = Vault::open(&paths).err().expect("must not open");
        assert!(matches!(err, VaultError::KeyUnavailable(_)));
    }

    #[test]
    fn rejects_empty_fields_before_storage() {
        let vault = memory_vault();
        assert_eq!(
            vault.add_credential("  ", "alice", "pw"),
            Err(VaultError::ValidationFailed { field: "website" })
        );
        assert_eq!(
            vault.add_credential("example.com", "", "pw"),
            Err(VaultError::ValidationFailed { field: "username" })
        );
        assert_eq!(
            vault.add_credential("example.com", "alice", ""),
            Err(VaultError::ValidationFailed { field: "password" })
        );
        assert!(vault.list_credentials().expect("list").is_empty());
    }

    #[test]
    fn trims_labels_but_not_passwords() {
        let vault = memory_vault();
        vault
            .add_credential("  example.com ", "\talice\n", "  spaced  ")
            .expect("add");

        let record = vault.list_credentials().expect("list").remove(0);
        assert_eq!(record.website, "example.com");
        assert_eq!(record.username, "alice");
        assert_eq!(
            vault.reveal_password(&record.ciphertext).expect("reveal").as_str(),
            "  spaced  "
        );
    }

    #[test]
    fn lists_newest_first() {
        let vault = memory_vault();
        for site in ["A", "B", "C"] {
            vault.add_credential(site, "u", "pw").expect("add");
        }
        let sites: Vec<_> = vault
            .list_credentials()
            .expect("list")
            .into_iter()
            .map(|r| r.website)
            .collect();
        assert_eq!(sites, vec!["C", "B", "A"]);
    }

    #[test]
    fn search_filters_by_website_or_username() {
        let vault = memory_vault();
        vault.add_credential("github.com", "alice", "pw").expect("add");
        vault.add_credential("gitlab.com", "bob", "pw").expect("add");
        vault.add_credential("netflix.com", "Alice", "pw").expect("add");

        let sites: Vec<_> = vault
            .search_credentials("ALICE")
            .expect("search")
            .into_iter()
            .map(|r| r.website)
            .collect();
        assert_eq!(sites, vec!["netflix.com", "github.com"]);
        assert_eq!(vault.search_credentials("").expect("search").len(), 3);
        assert!(vault.search_credentials("nope").expect("search").is_empty());
    }

    #[test]
    fn reveal_reports_failure_and_sentinel() {
        let vault = memory_vault();
        let foreign = CredentialCipher::new(&generate_key())
            .expect("cipher")
            .encrypt("elsewhere")
            .expect("encrypt");

        assert_eq!(
            vault.reveal_password(&foreign),
            Err(VaultError::DecryptionFailed)
        );
        assert_eq!(vault.reveal_or_sentinel(&foreign).as_str(), REVEAL_FAILED_SENTINEL);
        assert_eq!(vault.reveal_or_sentinel("garbage").as_str(), REVEAL_FAILED_SENTINEL);
        assert_eq!(vault.reveal_password("").expect("empty").as_str(), "");
    }

    #[test]
    fn delete_is_idempotent() {
        let vault = memory_vault();
        let id = vault.add_credential("example.com", "alice", "pw").expect("add");
        vault.delete_credential(id).expect("delete");
        vault.delete_credential(id).expect("delete again");
        vault.delete_credential(9999).expect("delete never-existing");
        assert!(vault.find_credential(id).expect("find").is_none());
    }

    #[test]
    fn listed_records_outlive_deletes() {
        let vault = memory_vault();
        let id = vault.add_credential("example.com", "alice", "pw").expect("add");
        let listed = vault.list_credentials().expect("list");
        vault.delete_credential(id).expect("delete");

        assert_eq!(listed[0].id, id);
        assert_eq!(
            vault.reveal_password(&listed[0].ciphertext).expect("reveal").as_str(),
            "pw"
        );
    }
}
