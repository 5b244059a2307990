//! The `/feedbacks` namespace: a daily index of who sent feedback when.
//!
//! Writes arrive from the feedbacks cascade as `/feedbacks/<time> = uid`
//! and are appended to a per-day file as `<time>:<uid>` lines; reads take
//! a day key (`yyyy-mm-dd`) and return the raw index text.

use bytes::Bytes;
use placehub_core::{Error, Handler, Value, Vfs};
use placehub_kv_store::ByteStore;

/// Relative keys: a full timestamp (writes) or a day (reads).
pub const KEY_RULE: &str = r"^/\d{4}-\d{2}-\d{2}(-\d{2}-\d{2}-\d{2})?$";

const DAY_LEN: usize = "yyyy-mm-dd".len();

/// Handler for `/feedbacks`.
pub struct FeedbackIndex<S> {
    store: S,
}

impl<S: ByteStore> FeedbackIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: ByteStore + Send> Handler for FeedbackIndex<S> {
    fn set(&mut self, _vfs: &Vfs, key: &str, data: Value) -> Result<(), Error> {
        let time = &key[1..];
        if time.len() == DAY_LEN {
            return Err(Error::BadPath {
                path: key.to_string(),
            });
        }
        let uid = data.as_str().ok_or_else(|| Error::BadData {
            path: key.to_string(),
            detail: "uid expected".to_string(),
        })?;
        let day = &time[..DAY_LEN];
        let line = format!("{}:{}\n", time, uid);
        self.store.add(day, Bytes::from(line))?;
        Ok(())
    }

    fn get(&mut self, _vfs: &Vfs, key: &str) -> Result<Option<Value>, Error> {
        let day = &key[1..];
        match self.store.get(day)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placehub_kv_store::MemStore;

    fn index() -> (Vfs, FeedbackIndex<MemStore>) {
        (Vfs::builder().build(), FeedbackIndex::new(MemStore::new()))
    }

    #[test]
    fn entries_accumulate_per_day() {
        let (vfs, mut index) = index();
        index
            .set(&vfs, "/2015-01-02-12-30-00", Value::from("0123456789abcdef"))
            .unwrap();
        index
            .set(&vfs, "/2015-01-02-13-00-00", Value::from("fedcba9876543210"))
            .unwrap();
        index
            .set(&vfs, "/2015-01-03-08-00-00", Value::from("0123456789abcdef"))
            .unwrap();

        let day = index.get(&vfs, "/2015-01-02").unwrap().unwrap();
        assert_eq!(
            day.as_str().unwrap(),
            "2015-01-02-12-30-00:0123456789abcdef\n2015-01-02-13-00-00:fedcba9876543210\n"
        );
        assert!(index.get(&vfs, "/2015-01-03").unwrap().is_some());
        assert_eq!(index.get(&vfs, "/2015-01-04").unwrap(), None);
    }

    #[test]
    fn set_requires_a_full_timestamp() {
        let (vfs, mut index) = index();
        let err = index
            .set(&vfs, "/2015-01-02", Value::from("0123456789abcdef"))
            .unwrap_err();
        assert!(matches!(err, Error::BadPath { .. }));
    }

    #[test]
    fn set_requires_a_string_uid() {
        let (vfs, mut index) = index();
        let err = index
            .set(&vfs, "/2015-01-02-12-30-00", Value::from(42))
            .unwrap_err();
        assert!(matches!(err, Error::BadData { .. }));
    }
}
