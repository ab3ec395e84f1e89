use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use keepsafe_storage::sqlite_store::SqliteCredentialStore;
use keepsafe_vault::{Vault, VaultPaths};
use tracing::debug;

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "KEEPSAFE_DATA_DIR";

/// Resolve the default data directory for Keepsafe.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("keepsafe"))
}

/// Work out key and database locations: explicit file paths win, then the
/// env override, then `data_dir` from config, then the platform default.
pub fn resolve_paths(config: &Config, env_data_dir: Option<PathBuf>) -> Result<VaultPaths> {
    let dir = match env_data_dir.or_else(|| config.data_dir.clone()) {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let defaults = VaultPaths::in_dir(&dir);
    Ok(VaultPaths {
        key_file: config.key_file.clone().unwrap_or(defaults.key_file),
        database_file: config
            .database_file
            .clone()
            .unwrap_or(defaults.database_file),
    })
}

/// Open the on-disk vault described by config (and the environment).
pub fn vault_from_config(config: &Config) -> Result<Vault<SqliteCredentialStore>> {
    let env_dir = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    let paths = resolve_paths(config, env_dir)?;
    debug!(key_file = %paths.key_file.display(), db = %paths.database_file.display(), "opening vault");
    Ok(Vault::open(&paths)?)
}

/// Helper for tests to open a vault rooted at a temp dir.
#[cfg(test)]
pub fn test_vault(root: impl Into<PathBuf>) -> Vault<SqliteCredentialStore> {
    Vault::open(&VaultPaths::in_dir(root.into())).expect("open test vault")
}
