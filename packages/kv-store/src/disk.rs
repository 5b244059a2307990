//! File-backed byte store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::traits::check_key;
use crate::{ByteStore, KvError};

/// A [`ByteStore`] keeping one file per key under a base directory.
///
/// Writes create missing parent directories; removing the last file in a
/// directory removes the now-empty directory as well, so the on-disk tree
/// mirrors the live keys exactly. `add` uses the filesystem's append mode
/// and never reads the file back.
pub struct DiskStore {
    base: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `base`. The directory is created lazily on
    /// the first write.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        log::debug!("disk store at {}", base.display());
        Self { base }
    }

    /// The base directory of this store.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, KvError> {
        let key = check_key(key)?;
        let mut path = self.base.clone();
        path.extend(key.split('/'));
        Ok(path)
    }

    fn ensure_parent(path: &Path) -> Result<(), KvError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Remove ancestor directories of `path` that became empty, stopping at
    /// the base directory or at the first non-empty ancestor.
    fn prune_empty_parents(&self, path: &Path) -> Result<(), KvError> {
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == self.base || !d.starts_with(&self.base) {
                break;
            }
            match fs::read_dir(d) {
                Ok(mut entries) => {
                    if entries.next().is_some() {
                        break;
                    }
                    log::debug!("pruning empty dir {}", d.display());
                    fs::remove_dir(d)?;
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => break,
                Err(err) => return Err(err.into()),
            }
            dir = d.parent();
        }
        Ok(())
    }
}

impl ByteStore for DiskStore {
    fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.file_path(key)?.exists())
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>, KvError> {
        let path = self.file_path(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, data: Option<Bytes>) -> Result<(), KvError> {
        let Some(bytes) = data else {
            return self.rm(key);
        };
        let path = self.file_path(key)?;
        Self::ensure_parent(&path)?;
        fs::write(&path, &bytes)?;
        Ok(())
    }

    fn add(&mut self, key: &str, data: Bytes) -> Result<(), KvError> {
        let path = self.file_path(key)?;
        Self::ensure_parent(&path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(&data)?;
        Ok(())
    }

    fn rm(&mut self, key: &str) -> Result<(), KvError> {
        let path = self.file_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => self.prune_empty_parents(&path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn dir(&self, key: &str) -> Result<Option<Vec<String>>, KvError> {
        let path = if key.is_empty() {
            self.base.clone()
        } else {
            self.file_path(key)?
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(Vec::new())),
            Ok(_) => {
                let mut children = Vec::new();
                for entry in fs::read_dir(&path)? {
                    let entry = entry?;
                    children.push(entry.file_name().to_string_lossy().into_owned());
                }
                children.sort();
                Ok(Some(children))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
