//! Durable session storage.
//!
//! One file per key under a data directory, mirroring the fixed storage
//! keys the backend contract names: `access_token`, `refresh_token`, and
//! `user` (serialized profile). Writes go through a temp file and rename
//! so a crash never leaves a half-written key behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Storage key for the short-lived access token.
pub const KEY_ACCESS_TOKEN: &str = "access_token";

/// Storage key for the long-lived refresh token.
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";

/// Storage key for the serialized user profile.
pub const KEY_USER: &str = "user";

/// All keys this store manages, in clear order.
const ALL_KEYS: [&str; 3] = [KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER];

/// Durable key-value store for session state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read the value stored under `key`, if any.
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session key '{key}'"))?;
        Ok(Some(contents))
    }

    /// Write `value` under `key`, replacing any previous value.
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .context("Failed to create session store directory")?;
        let path = self.key_path(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)
            .with_context(|| format!("Failed to write session key '{key}'"))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to commit session key '{key}'"))?;
        Ok(())
    }

    /// Remove `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session key '{key}'"))?;
        }
        Ok(())
    }

    /// Remove every session key.
    pub fn clear(&self) -> Result<()> {
        for key in ALL_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_path(key).exists()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}
