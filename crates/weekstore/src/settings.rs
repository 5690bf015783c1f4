//! Key-value settings store
//!
//! File layout:
//! - `settings.wkv`: header + sorted `key=value` lines, rewritten atomically
//!   on every mutation

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ahash::RandomState;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::parser::{encode_entry, is_valid_key, parse_settings, SettingsHeader};
use crate::slot::write_atomic;

/// File name of the settings file inside the store directory
pub const SETTINGS_FILE: &str = "settings.wkv";

type Entries = HashMap<String, String, RandomState>;

/// Persistent string-to-string map
pub struct SettingsStore {
    /// Path to the settings file
    path: PathBuf,

    /// In-memory copy of every entry
    entries: RwLock<Entries>,

    /// Is the store closed?
    closed: RwLock<bool>,
}

impl SettingsStore {
    /// Open or create a settings store in the given directory
    ///
    /// # Arguments
    /// * `dir` - Directory holding `settings.wkv`
    ///
    /// # Returns
    /// * `Result<SettingsStore>` - Store handle, or `Error::Parse` if the file is corrupt
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(SETTINGS_FILE);
        let entries = Self::load(&path)?;
        debug!("Opened settings at {:?} ({} entries)", path, entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            closed: RwLock::new(false),
        })
    }

    fn load(path: &Path) -> Result<Entries> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No settings file at {:?}, starting empty", path);
                return Ok(Entries::default());
            }
            Err(e) => return Err(e.into()),
        };

        let parsed = parse_settings(&bytes)?;
        Ok(parsed.into_iter().collect())
    }

    fn persist(&self, entries: &Entries) -> Result<()> {
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();

        let mut buf = Vec::new();
        SettingsHeader::new(entries.len() as u32).encode(&mut buf);
        for key in keys {
            encode_entry(key, &entries[key], &mut buf);
        }

        write_atomic(&self.path, &buf)
    }

    fn ensure_open(&self) -> Result<()> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        Ok(self.entries.read().get(key).cloned())
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// The in-memory map is left unchanged if the file write fails.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_open()?;

        if !is_valid_key(key) {
            return Err(Error::InvalidKey(key.to_string()));
        }
        if value.contains('\n') {
            return Err(Error::InvalidValue(key.to_string()));
        }

        let mut entries = self.entries.write();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }

        Ok(())
    }

    /// Remove `key`
    ///
    /// # Returns
    /// * `Result<bool>` - `true` if the key existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;

        let mut entries = self.entries.write();
        let Some(previous) = entries.remove(key) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }

        Ok(true)
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the store; later reads and writes fail with `Error::Closed`
    pub fn close(&self) {
        *self.closed.write() = true;
    }
}
