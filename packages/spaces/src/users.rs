//! The `/users` namespace: per-user JSON documents.
//!
//! Every leaf is one JSON value in the byte store. User data is sharded
//! into `uid[0..3]/uid[3..6]/uid[6..]` to bound directory fan-out.

use bytes::Bytes;
use placehub_core::{Error, Handler, Value, Vfs};
use placehub_kv_store::ByteStore;

/// Relative keys: `/<uid16>` optionally followed by a subtree path.
pub const KEY_RULE: &str = r"^/[0-9a-f]{16}(/.+)?$";

/// Handler for `/users`.
pub struct UserSpace<S> {
    store: S,
}

impl<S: ByteStore> UserSpace<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Map a relative key to its sharded storage key.
    ///
    /// The key rule guarantees a 16-hex-char uid right after the leading
    /// slash, so the byte slicing below cannot split a char.
    fn storage_key(rel: &str) -> String {
        let uid = &rel[1..17];
        let rest = &rel[17..];
        format!("{}/{}/{}{}", &uid[..3], &uid[3..6], &uid[6..], rest)
    }

    /// Enumerate all user ids by walking the three shard levels.
    fn all_uids(&self) -> Result<Vec<String>, Error> {
        let mut uids = Vec::new();
        let Some(level1) = self.store.dir("")? else {
            return Ok(uids);
        };
        for a in level1 {
            for b in self.store.dir(&a)?.unwrap_or_default() {
                for c in self.store.dir(&format!("{}/{}", a, b))?.unwrap_or_default() {
                    uids.push(format!("{}{}{}", a, b, c));
                }
            }
        }
        uids.sort();
        Ok(uids)
    }
}

impl<S: ByteStore + Send> Handler for UserSpace<S> {
    fn exists(&mut self, _vfs: &Vfs, key: &str) -> Result<bool, Error> {
        Ok(self.store.exists(&Self::storage_key(key))?)
    }

    fn get(&mut self, _vfs: &Vfs, key: &str) -> Result<Option<Value>, Error> {
        match self.store.get(&Self::storage_key(key))? {
            None => Ok(None),
            Some(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(&bytes)?;
                Ok(Some(Value::from_json(&json)))
            }
        }
    }

    fn set(&mut self, _vfs: &Vfs, key: &str, data: Value) -> Result<(), Error> {
        let storage_key = Self::storage_key(key);
        if data.is_null() {
            self.store.set(&storage_key, None)?;
        } else {
            let json = serde_json::to_vec(&data.to_json())?;
            self.store.set(&storage_key, Some(Bytes::from(json)))?;
        }
        Ok(())
    }

    fn rm(&mut self, _vfs: &Vfs, key: &str) -> Result<(), Error> {
        Ok(self.store.rm(&Self::storage_key(key))?)
    }

    fn dir(&mut self, _vfs: &Vfs, key: &str) -> Result<Option<Vec<String>>, Error> {
        if key.is_empty() {
            // Listing the mount root: recompose uids from the shard levels.
            let uids = self.all_uids()?;
            return Ok(if uids.is_empty() { None } else { Some(uids) });
        }
        Ok(self.store.dir(&Self::storage_key(key))?)
    }
}
