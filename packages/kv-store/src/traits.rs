//! The `ByteStore` capability set.

use bytes::Bytes;

use crate::KvError;

/// Byte-oriented key/value storage under relative slash-separated keys.
///
/// Semantics every implementation must uphold:
///
/// - `get` returns `None` for a missing key.
/// - `set` with `None` deletes the key (and prunes empty parents).
/// - `add` appends without reading first; appends to one key are monotonic.
/// - `dir` lists immediate child segments only, and distinguishes a key
///   that was never created (`None`) from one that exists (`Some`), even
///   when the child list is empty.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn ByteStore>`.
pub trait ByteStore: Send + Sync {
    /// Check whether a key exists, as a leaf or as a parent of other keys.
    fn exists(&self, key: &str) -> Result<bool, KvError>;

    /// Read the bytes at a key. `None` if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Bytes>, KvError>;

    /// Write the bytes at a key, creating parents as needed.
    ///
    /// `None` deletes the key; deleting the last child of a parent removes
    /// the now-empty parent as well.
    fn set(&mut self, key: &str, data: Option<Bytes>) -> Result<(), KvError>;

    /// Append bytes to a key without reading it first.
    fn add(&mut self, key: &str, data: Bytes) -> Result<(), KvError>;

    /// Remove a key. Removing a missing key is a no-op.
    fn rm(&mut self, key: &str) -> Result<(), KvError>;

    /// List the immediate child segments of a key.
    ///
    /// `None` if the key does not exist at all; `Some(vec![])` if it exists
    /// as a leaf with no children. The empty key names the store root and
    /// lists the top-level segments.
    fn dir(&self, key: &str) -> Result<Option<Vec<String>>, KvError>;
}

/// Validate a relative storage key: non-empty slash-separated segments,
/// no `.` or `..` components.
pub(crate) fn check_key(key: &str) -> Result<&str, KvError> {
    let ok = !key.is_empty()
        && key
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if ok {
        Ok(key)
    } else {
        Err(KvError::BadKey {
            key: key.to_string(),
        })
    }
}

impl<T: ByteStore + ?Sized> ByteStore for Box<T> {
    fn exists(&self, key: &str) -> Result<bool, KvError> {
        self.as_ref().exists(key)
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>, KvError> {
        self.as_ref().get(key)
    }

    fn set(&mut self, key: &str, data: Option<Bytes>) -> Result<(), KvError> {
        self.as_mut().set(key, data)
    }

    fn add(&mut self, key: &str, data: Bytes) -> Result<(), KvError> {
        self.as_mut().add(key, data)
    }

    fn rm(&mut self, key: &str) -> Result<(), KvError> {
        self.as_mut().rm(key)
    }

    fn dir(&self, key: &str) -> Result<Option<Vec<String>>, KvError> {
        self.as_ref().dir(key)
    }
}
