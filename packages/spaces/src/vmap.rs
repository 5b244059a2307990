//! The `/vmap` namespace: visitors bucketed by location pointer.
//!
//! Key: a 10-hex-char location pointer (100x100 m cell at the default
//! resolution). Value: an append-only log of `uid=tskey` lines, reduced on
//! read to uid -> latest tskey. A `null` tskey line removes the uid from
//! the bucket. Visitors whose place record no longer exists are dropped at
//! read time - deleting a place hides all its historical bucket entries
//! without a delete-cascade back into every bucket it ever touched.

use std::collections::BTreeMap;

use bytes::Bytes;
use placehub_core::{Auth, Error, Handler, Shape, Value, Vfs};
use placehub_kv_store::ByteStore;

use crate::shapes;

/// Relative keys: one 10-hex-char location pointer.
pub const KEY_RULE: &str = r"^/[0-9a-f]{10}$";

/// The value accepted by `add`: one visit entry.
pub fn data_shape() -> Shape {
    Shape::dict([
        ("uid", shapes::uid()),
        ("tskey", Shape::null_or(shapes::tskey())),
    ])
}

/// Handler for `/vmap`.
pub struct VisitorMap<S> {
    store: S,
}

impl<S: ByteStore> VisitorMap<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Shard the pointer hex into `ptr[0..3]/ptr[3..5]/ptr[5..]`.
    fn storage_key(rel: &str) -> String {
        let hex = &rel[1..];
        format!("{}/{}/{}", &hex[..3], &hex[3..5], &hex[5..])
    }

    /// Fold the append log into uid -> latest tskey.
    fn fold_log(text: &str) -> BTreeMap<String, String> {
        let mut visitors = BTreeMap::new();
        for line in text.lines() {
            let Some((uid, tskey)) = line.split_once('=') else {
                continue;
            };
            if tskey == "null" {
                visitors.remove(uid);
            } else {
                visitors.insert(uid.to_string(), tskey.to_string());
            }
        }
        visitors
    }

    /// True while the canonical place record is complete: deleting any of
    /// its time/lat/lon leaves removes the visit from bucket reads.
    fn place_exists(vfs: &Vfs, uid: &str, tskey: &str) -> Result<bool, Error> {
        let base = format!("/users/{}/places/{}", uid, tskey);
        for prop in ["time", "lat", "lon"] {
            if !vfs.exists(&Auth::System, &format!("{}/{}", base, prop))? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<S: ByteStore + Send> Handler for VisitorMap<S> {
    fn get(&mut self, vfs: &Vfs, key: &str) -> Result<Option<Value>, Error> {
        let Some(bytes) = self.store.get(&Self::storage_key(key))? else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut visitors = Self::fold_log(&text);

        let mut left = Vec::new();
        for (uid, tskey) in &visitors {
            if !Self::place_exists(vfs, uid, tskey)? {
                left.push(uid.clone());
            }
        }
        if !left.is_empty() {
            log::debug!("vmap {}: {} visitor(s) left", key, left.len());
            for uid in &left {
                visitors.remove(uid);
            }
        }

        let map = visitors
            .into_iter()
            .map(|(uid, tskey)| (uid, Value::String(tskey)))
            .collect();
        Ok(Some(Value::Map(map)))
    }

    fn add(&mut self, _vfs: &Vfs, key: &str, data: Value) -> Result<(), Error> {
        let bad_data = |detail: &str| Error::BadData {
            path: key.to_string(),
            detail: detail.to_string(),
        };
        let uid = data
            .get("uid")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_data("uid expected"))?;
        let tskey = match data.get("tskey") {
            None | Some(Value::Null) => "null",
            Some(Value::String(tskey)) => tskey,
            Some(_) => return Err(bad_data("tskey expected")),
        };
        let line = format!("{}={}\n", uid, tskey);
        self.store.add(&Self::storage_key(key), Bytes::from(line))?;
        Ok(())
    }
}
