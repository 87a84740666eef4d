//! Durable key-value storage behind a swappable interface.
//!
//! Persisted UI state (the trust-guide completion flag) only ever needs
//! `get`/`set`/`remove`, so the concrete backend stays replaceable:
//! file-backed on device, in-memory for ephemeral sessions and tests.

use fg_core::EmbedError;
use fg_core::EmbedResult;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Key-value contract consumed by persisted UI state.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> EmbedResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> EmbedResult<()>;
    fn remove(&mut self, key: &str) -> EmbedResult<()>;
}

/// File-backed store: one sanitized file per key under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn with_default_root() -> Self {
        Self::new(default_storage_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> EmbedResult<PathBuf> {
        let name = sanitize_key(key)?;
        Ok(self.root.join(format!("{name}.kv")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> EmbedResult<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let value = fs::read_to_string(&path).map_err(|error| {
            EmbedError::new(
                "storage.read_failed",
                format!("failed to read `{}`: {error}", path.display()),
            )
        })?;

        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &str) -> EmbedResult<()> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                EmbedError::new(
                    "storage.dir_create_failed",
                    format!("failed to create `{}`: {error}", parent.display()),
                )
            })?;
        }

        fs::write(&path, value).map_err(|error| {
            EmbedError::new(
                "storage.write_failed",
                format!("failed to write `{}`: {error}", path.display()),
            )
        })
    }

    fn remove(&mut self, key: &str) -> EmbedResult<()> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path).map_err(|error| {
            EmbedError::new(
                "storage.remove_failed",
                format!("failed to remove `{}`: {error}", path.display()),
            )
        })
    }
}

/// In-memory store for ephemeral sessions and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> EmbedResult<Option<String>> {
        let name = sanitize_key(key)?;
        Ok(self.entries.get(&name).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> EmbedResult<()> {
        let name = sanitize_key(key)?;
        self.entries.insert(name, value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> EmbedResult<()> {
        let name = sanitize_key(key)?;
        self.entries.remove(&name);
        Ok(())
    }
}

fn default_storage_root() -> PathBuf {
    if let Some(override_root) = std::env::var_os("FRAMEGUARD_STORAGE_DIR") {
        return PathBuf::from(override_root);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".frameguard")
}

fn sanitize_key(key: &str) -> EmbedResult<String> {
    let mut out = String::new();
    for ch in key.trim().to_ascii_lowercase().chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }

    if out.is_empty() {
        return Err(EmbedError::new(
            "storage.key_invalid",
            "storage key must not be empty",
        ));
    }

    Ok(out)
}
