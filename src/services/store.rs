// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, DEFAULT_SYSTEM_PROMPT, Provider};
use crate::error::{Error, Result};

/// Key under which the serialized [`Config`] is stored.
pub const STORAGE_KEY: &str = "code-reviewer-config";

/// Minimal string key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

/// In-process store, mainly for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    Error::Config(format!("store {} is corrupt: {e}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = entries.len(), "store opened");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let body = serde_json::to_string_pretty(&self.entries)?;

        // Write to temp file first, then rename (atomic)
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, body)?;

        // The store holds an API key in clear text (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&temp)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp, perms)?;
        }

        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

/// Owns the current [`Config`] and persists every change through `S`.
pub struct ConfigStore<S: KeyValueStore> {
    store: S,
    config: Config,
}

impl<S: KeyValueStore> ConfigStore<S> {
    /// Rehydrate from `store`, falling back to defaults when nothing is saved.
    pub fn open(store: S) -> Result<Self> {
        let config = match store.get(STORAGE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| Error::Config(format!("saved configuration is invalid: {e}")))?,
            None => Config::default(),
        };

        Ok(Self { store, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Owned copy for handing to a review.
    pub fn snapshot(&self) -> Config {
        self.config.clone()
    }

    /// Switch provider. Keys are provider-specific, so the key is always cleared.
    pub fn set_provider(&mut self, provider: Provider) -> Result<()> {
        self.config.provider = provider;
        self.config.api_key.clear();
        self.persist()
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) -> Result<()> {
        self.config.api_key = key.into();
        self.persist()
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) -> Result<()> {
        self.config.system_prompt = prompt.into();
        self.persist()
    }

    pub fn reset_system_prompt(&mut self) -> Result<()> {
        self.set_system_prompt(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn persist(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.config)?;
        self.store.set(STORAGE_KEY, blob)?;
        debug!(provider = %self.config.provider, "config persisted");
        Ok(())
    }
}
