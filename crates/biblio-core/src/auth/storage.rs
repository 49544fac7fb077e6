//! Durable key-value storage behind the persisted session record.
//!
//! The record is a handful of keys written together on login and removed
//! together on logout. [`FileSessionStorage`] keeps them in
//! `<base>/session.json` with restricted permissions (0600); tokens are never
//! logged.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde_json::Value;

/// Raw encoded token.
pub const KEY_AUTH_TOKEN: &str = "auth_token";
/// The signed-in user object.
pub const KEY_USER_DATA: &str = "user_data";
/// Roles derived from the token.
pub const KEY_USER_ROLES: &str = "user_roles";
/// Token lifetime in seconds as reported at login.
pub const KEY_TOKEN_EXPIRES_IN: &str = "token_expires_in";
/// Token type as reported at login (e.g. `Bearer`).
pub const KEY_TOKEN_TYPE: &str = "token_type";

/// Every key of the persisted session record.
pub const SESSION_KEYS: [&str; 5] = [
    KEY_AUTH_TOKEN,
    KEY_USER_DATA,
    KEY_USER_ROLES,
    KEY_TOKEN_EXPIRES_IN,
    KEY_TOKEN_TYPE,
];

/// A durable key-value slot holding JSON values.
pub trait SessionStorage: Send + Sync {
    /// Reads one key.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes several keys as one commit.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<()>;

    /// Removes several keys as one commit. Missing keys are ignored.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn remove_many(&self, keys: &[&str]) -> Result<()>;

    /// Writes one key.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_many(vec![(key, value)])
    }

    /// Removes one key.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<()> {
        self.remove_many(&[key])
    }
}

/// In-process storage. Lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, new_entries: Vec<(&str, Value)>) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// JSON-file storage, one object per file.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage at the default location under the biblio home directory.
    ///
    /// # Errors
    /// Returns an error if the biblio home directory cannot be resolved.
    pub fn at_default_path() -> Result<Self> {
        Ok(Self::new(crate::config::paths::session_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    fn save(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove session file {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(entries).context("Failed to serialize session")?;

        // Write to a sibling temp file, then rename over the record.
        let tmp_path = self.path.with_extension("json.tmp");

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set_many(&self, new_entries: Vec<(&str, Value)>) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt record is replaced rather than blocking new logins.
        let mut entries = self.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable session record");
            BTreeMap::new()
        });
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value);
        }
        self.save(&entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load().unwrap_or_default();
        for key in keys {
            entries.remove(*key);
        }
        self.save(&entries)
    }
}
