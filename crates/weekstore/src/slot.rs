//! Fixed-name file slots
//!
//! A slot is a single file directly under the store root. Writes go to a
//! hidden temporary sibling, are fsynced, then renamed over the slot, so a
//! reader sees either the previous contents or the new ones.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Directory of atomically replaced files
#[derive(Debug, Clone)]
pub struct SlotStore {
    root: PathBuf,
}

impl SlotStore {
    /// Open (creating if needed) a slot directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a slot, whether or not it exists
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Check whether a slot currently holds a file
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Size of a slot's file in bytes
    pub fn size(&self, name: &str) -> Result<u64> {
        Ok(fs::metadata(self.path(name)?)?.len())
    }

    /// Read a slot's contents
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(name)?)?)
    }

    /// Replace a slot's contents atomically
    ///
    /// # Returns
    /// * `Result<PathBuf>` - Path of the written slot
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(name)?;
        write_atomic(&path, bytes)?;
        debug!("Wrote slot {} ({} bytes)", name, bytes.len());
        Ok(path)
    }

    /// Delete a slot
    ///
    /// # Returns
    /// * `Result<bool>` - `true` if a file was removed, `false` if it was already absent
    pub fn remove(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.path(name)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\']);

    if plain {
        Ok(())
    } else {
        Err(Error::InvalidSlotName(name.to_string()))
    }
}

/// Write `bytes` to `path` through a temporary sibling and a rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidSlotName(path.display().to_string()))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });

    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    // The rename is durable only once the directory entry is
    if let Err(e) = sync_parent(path) {
        warn!("Failed to sync directory of {}: {}", path.display(), e);
    }

    Ok(())
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
