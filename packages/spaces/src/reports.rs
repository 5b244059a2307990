//! The `/reports` namespace: per-user abuse report inboxes.
//!
//! The reports cascade writes `/reports/<reported>/<reporter>` with the
//! server-assigned receipt time; moderation tooling reads the inbox back.

use bytes::Bytes;
use placehub_core::{Error, Handler, Value, Vfs};
use placehub_kv_store::ByteStore;

/// Relative keys: `/<reported uid>/<reporter uid>`.
pub const KEY_RULE: &str = r"^/[0-9a-f]{16}(/[0-9a-f]{16})?$";

/// Handler for `/reports`.
pub struct ReportInbox<S> {
    store: S,
}

impl<S: ByteStore> ReportInbox<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: ByteStore + Send> Handler for ReportInbox<S> {
    fn set(&mut self, _vfs: &Vfs, key: &str, data: Value) -> Result<(), Error> {
        let storage_key = &key[1..];
        if data.is_null() {
            self.store.set(storage_key, None)?;
        } else {
            let json = serde_json::to_vec(&data.to_json())?;
            self.store.set(storage_key, Some(Bytes::from(json)))?;
        }
        Ok(())
    }

    fn get(&mut self, _vfs: &Vfs, key: &str) -> Result<Option<Value>, Error> {
        match self.store.get(&key[1..])? {
            None => Ok(None),
            Some(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(&bytes)?;
                Ok(Some(Value::from_json(&json)))
            }
        }
    }

    fn dir(&mut self, _vfs: &Vfs, key: &str) -> Result<Option<Vec<String>>, Error> {
        Ok(self.store.dir(&key[1..])?)
    }
}
