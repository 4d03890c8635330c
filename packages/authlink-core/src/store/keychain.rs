use super::file::FileConfigStore;
use super::ConfigStore;
use anyhow::{Context, Result};
use keyring::Entry;

/// Service name used for keyring storage
const KEYRING_SERVICE: &str = "authlink";

/// Platform keyring, one entry per key, with the file store as fallback
/// whenever the keyring is unavailable.
#[derive(Debug, Clone)]
pub struct KeyringConfigStore {
    fallback: FileConfigStore,
}

impl KeyringConfigStore {
    pub fn new(fallback: FileConfigStore) -> Self {
        Self { fallback }
    }
}

fn get_keyring_entry(key: &str) -> Result<Entry> {
    tracing::trace!(
        "Creating keyring entry for service='{}', user='{}'",
        KEYRING_SERVICE,
        key
    );

    Entry::new(KEYRING_SERVICE, key).map_err(|e| {
        tracing::error!(
            "Failed to create keyring entry (service='{}', user='{}'): {}",
            KEYRING_SERVICE,
            key,
            e
        );
        anyhow::anyhow!("Failed to create keyring entry: {}", e)
    })
}

impl ConfigStore for KeyringConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = match get_keyring_entry(key) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("{}, trying file fallback", e);
                return self.fallback.get(key);
            }
        };

        match entry.get_password() {
            Ok(value) => {
                tracing::debug!("'{}' loaded from keyring", key);
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("No '{}' in keyring, trying file fallback", key);
                self.fallback.get(key)
            }
            Err(e) => {
                tracing::warn!("Failed to read '{}' from keyring: {}, trying file fallback", key, e);
                self.fallback.get(key)
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = match get_keyring_entry(key) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("{}, using file storage", e);
                return self.fallback.set(key, value);
            }
        };

        if let Err(e) = entry.set_password(value) {
            tracing::warn!("Failed to save '{}' to keyring: {}, using file storage", key, e);
            return self.fallback.set(key, value);
        }

        // Verify the save worked
        match get_keyring_entry(key)?.get_password() {
            Ok(stored) if stored == value => {
                tracing::debug!("'{}' verified in keyring after save", key);
                // Drop any older plaintext copy
                if let Err(e) = self.fallback.delete(key) {
                    tracing::debug!("Failed to clear file copy of '{}': {}", key, e);
                }
                Ok(())
            }
            Ok(_) => {
                tracing::warn!("Keyring mismatch after save, using file storage as primary");
                self.fallback.set(key, value)
            }
            Err(keyring::Error::NoEntry) => {
                tracing::warn!("'{}' not found after save, falling back to file storage", key);
                self.fallback.set(key, value)
            }
            Err(e) => {
                tracing::warn!("Could not verify '{}' after save: {}, keeping file copy", key, e);
                self.fallback.set(key, value)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        // Always delete from file as well
        self.fallback.delete(key)?;

        let entry = get_keyring_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete from keyring"),
        }
    }

    fn describe(&self) -> String {
        #[cfg(target_os = "windows")]
        let backend = "Windows Credential Manager";
        #[cfg(target_os = "macos")]
        let backend = "macOS Keychain";
        #[cfg(target_os = "linux")]
        let backend = "Linux Secret Service (GNOME Keyring/KWallet)";
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        let backend = "Platform keyring";

        format!(
            "{} (with file fallback at {})",
            backend,
            self.fallback.path().display()
        )
    }
}
