//! In-memory byte store.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};

use crate::traits::check_key;
use crate::{ByteStore, KvError};

/// An in-memory [`ByteStore`] backed by a sorted map.
///
/// Used by tests and by `memfs` deployments where the process keeps all
/// state in memory. Keys are normalized slash-separated paths; parent
/// "directories" exist implicitly while they have children.
#[derive(Default)]
pub struct MemStore {
    data: BTreeMap<String, BytesMut>,
}

impl MemStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leaves.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteStore for MemStore {
    fn exists(&self, key: &str) -> Result<bool, KvError> {
        let key = check_key(key)?;
        if self.data.contains_key(key) {
            return Ok(true);
        }
        let prefix = format!("{}/", key);
        Ok(self
            .data
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix)))
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>, KvError> {
        let key = check_key(key)?;
        Ok(self.data.get(key).map(|b| b.clone().freeze()))
    }

    fn set(&mut self, key: &str, data: Option<Bytes>) -> Result<(), KvError> {
        match data {
            Some(bytes) => {
                let key = check_key(key)?;
                self.data.insert(key.to_string(), BytesMut::from(&bytes[..]));
                Ok(())
            }
            None => self.rm(key),
        }
    }

    fn add(&mut self, key: &str, data: Bytes) -> Result<(), KvError> {
        let key = check_key(key)?;
        self.data
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(&data);
        Ok(())
    }

    fn rm(&mut self, key: &str) -> Result<(), KvError> {
        let key = check_key(key)?;
        self.data.remove(key);
        Ok(())
    }

    fn dir(&self, key: &str) -> Result<Option<Vec<String>>, KvError> {
        if key.is_empty() {
            let mut roots: Vec<String> = Vec::new();
            for k in self.data.keys() {
                let root = k.split('/').next().unwrap_or(k);
                if roots.last().map(String::as_str) != Some(root) {
                    roots.push(root.to_string());
                }
            }
            return Ok(if roots.is_empty() { None } else { Some(roots) });
        }
        let key = check_key(key)?;
        if self.data.contains_key(key) {
            return Ok(Some(Vec::new()));
        }
        let prefix = format!("{}/", key);
        let mut children: Vec<String> = Vec::new();
        for (k, _) in self.data.range(prefix.clone()..) {
            let Some(rest) = k.strip_prefix(&prefix) else {
                break;
            };
            let child = rest.split('/').next().unwrap_or(rest);
            if children.last().map(String::as_str) != Some(child) {
                children.push(child.to_string());
            }
        }
        if children.is_empty() {
            Ok(None)
        } else {
            Ok(Some(children))
        }
    }
}
