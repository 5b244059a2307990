//! Core placehub namespace.
//!
//! This layer gives meaning to raw storage: validated virtual paths, a
//! tree-shaped [`Value`] type, composable [`Shape`] validators, the
//! path-based access policy, the [`Vfs`] router with its mount table, the
//! watcher engine for reactive change propagation, and the [`LocPtr`]
//! geospatial bucket codec.
//!
//! # Example
//!
//! ```rust
//! use placehub_core::{Auth, Handler, Mount, Value, Vfs};
//!
//! struct Echo;
//! impl Handler for Echo {
//!     fn get(&mut self, _vfs: &Vfs, key: &str) -> Result<Option<Value>, placehub_core::Error> {
//!         Ok(Some(Value::from(key)))
//!     }
//! }
//!
//! let vfs = Vfs::builder().mount(Mount::new("echo", "^/.+$", Echo)).build();
//! let value = vfs.get(&Auth::System, "/echo/hello").unwrap();
//! assert_eq!(value, Some(Value::from("/hello")));
//! ```

pub mod acl;
mod error;
mod locptr;
mod path;
mod shape;
mod value;
mod vfs;
pub mod watch;

pub use acl::{AclOp, Auth};
pub use error::{Error, ErrorKind};
pub use locptr::{LocPtr, DEFAULT_CELLS_PER_DEGREE};
pub use path::VPath;
pub use shape::{Shape, Violation};
pub use value::Value;
pub use vfs::{Handler, Mount, Vfs, VfsBuilder};
pub use watch::{ChangeKey, Watch, WatchHook, WatchMask, WatchMode};
