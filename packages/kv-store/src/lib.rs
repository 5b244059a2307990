//! Low-level placehub byte store.
//!
//! This layer moves raw bytes under relative string keys and knows nothing
//! about virtual paths, values or schemas - those belong to higher layers.
//! Two implementations are provided:
//!
//! - [`DiskStore`]: one file per key under a base directory, with parent
//!   directories created on write and empty parents pruned on removal.
//! - [`MemStore`]: an in-memory map for tests and `memfs` deployments.
//!
//! # Example
//!
//! ```rust
//! use placehub_kv_store::{ByteStore, MemStore};
//!
//! let mut store = MemStore::new();
//! store.set("abc/profile/name", Some(b"Alice".as_ref().into())).unwrap();
//! assert!(store.exists("abc/profile/name").unwrap());
//! ```

mod disk;
mod error;
mod mem;
mod traits;

pub use bytes::Bytes;
pub use disk::DiskStore;
pub use error::KvError;
pub use mem::MemStore;
pub use traits::ByteStore;
