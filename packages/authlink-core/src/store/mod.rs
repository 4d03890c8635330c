//! Persistent configuration store.
//!
//! Storage priority:
//! 1. Platform keyring (if `keyring-storage` feature enabled and available)
//! 2. File-based storage (`~/.config/authlink/store.json`, mode 0600 on Unix)

mod file;
#[cfg(all(feature = "keyring-storage", not(feature = "file-storage")))]
mod keychain;

pub use file::FileConfigStore;
#[cfg(all(feature = "keyring-storage", not(feature = "file-storage")))]
pub use keychain::KeyringConfigStore;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Key the API credential is stored under
pub const API_KEY: &str = "api";

/// Named string values that survive between runs.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    /// Human-readable storage location (for documentation/debugging)
    fn describe(&self) -> String;
}

/// Get the authlink config directory
pub(crate) fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .context("Failed to find config directory")?;
    Ok(config_dir.join("authlink"))
}

/// The store selected by the enabled features.
pub fn default_store() -> Result<Arc<dyn ConfigStore>> {
    let file = FileConfigStore::default_location()?;

    #[cfg(all(feature = "keyring-storage", not(feature = "file-storage")))]
    let store: Arc<dyn ConfigStore> = Arc::new(KeyringConfigStore::new(file));

    #[cfg(not(all(feature = "keyring-storage", not(feature = "file-storage"))))]
    let store: Arc<dyn ConfigStore> = Arc::new(file);

    Ok(store)
}
