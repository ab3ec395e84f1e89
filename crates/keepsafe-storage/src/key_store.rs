use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use rand::{rngs::OsRng, RngCore};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

/// Length of a freshly generated key (256-bit, as AES-256-GCM requires).
pub const KEY_LEN: usize = 32;

/// Raw key material as read from (or written to) the key file.
///
/// No length check happens here; a malformed key is rejected when the
/// cipher is constructed from it. Bytes are wiped on drop and never shown
/// in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Key(Zeroizing<Vec<u8>>);

impl Key {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key([REDACTED; {} bytes])", self.0.len())
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file {path} is unavailable: {reason}")]
    Unavailable { path: String, reason: String },
    #[error("key generation error: {0}")]
    Generation(String),
}

/// Owns the lifecycle of the vault's single symmetric key.
pub trait KeyStore: Send + Sync {
    /// Return the persisted key, creating and persisting a new one on first use.
    fn load_or_create(&self) -> Result<Key, KeyError>;
}

/// Key persisted verbatim in a local file.
///
/// A read failure is never answered with a fresh key: doing so would orphan
/// every token encrypted under the old one.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing(&self) -> Result<Key, KeyError> {
        fs::read(&self.path)
            .map(Key::from_bytes)
            .map_err(|err| unavailable(&self.path, err))
    }

    fn create(&self) -> Result<Key, KeyError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|err| unavailable(&self.path, err))?;

        let key = generate_key();
        // Temp files are created owner-only (0600 on unix).
        let mut tmp = NamedTempFile::new_in(parent).map_err(|err| unavailable(&self.path, err))?;
        tmp.write_all(key.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| unavailable(&self.path, err))?;

        match tmp.persist_noclobber(&self.path) {
            Ok(_) => {
                info!(path = %self.path.display(), "generated new vault key");
                Ok(key)
            }
            // Lost a creation race; the winner's key is the vault key.
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => self.read_existing(),
            Err(err) => Err(unavailable(&self.path, err.error)),
        }
    }
}

impl KeyStore for FileKeyStore {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn load_or_create(&self) -> Result<Key, KeyError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                debug!("loaded existing key file");
                Ok(Key::from_bytes(bytes))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => self.create(),
            Err(err) => Err(unavailable(&self.path, err)),
        }
    }
}

/// In-memory key store for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyStore {
    inner: Arc<Mutex<Option<Key>>>,
}

impl InMemoryKeyStore {
    /// Pre-load a known key.
    pub fn with_key(key: Key) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(key))),
        }
    }
}

impl KeyStore for InMemoryKeyStore {
    fn load_or_create(&self) -> Result<Key, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let key = generate_key();
        *guard = Some(key.clone());
        Ok(key)
    }
}

/// A fresh random key from the OS CSPRNG.
pub fn generate_key() -> Key {
    let mut bytes = Zeroizing::new(vec![0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut bytes);
    Key(bytes)
}

fn unavailable(path: &Path, err: io::Error) -> KeyError {
    KeyError::Unavailable {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
