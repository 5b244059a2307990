//! The placehub namespaces.
//!
//! Assembles the virtual namespace of the location/social backend:
//!
//! - `/users` - per-user subtrees (profile, places, chats, feedbacks,
//!   reports, unread markers), schema-validated;
//! - `/vmap` - visitor buckets keyed by location pointer;
//! - `/feedbacks` - the daily feedback index;
//! - `/reports` - per-user abuse report inboxes;
//!
//! plus the four cascades deriving the latter three from writes to the
//! first. [`init`] builds everything explicitly at startup; nothing is
//! registered as an import-time side effect.
//!
//! # Example
//!
//! ```rust
//! use placehub_core::{Auth, Value};
//! use placehub_spaces::{init, Config};
//!
//! let vfs = init(&Config::memfs());
//! let alice = Auth::user("0123456789abcdef");
//! vfs.set(&alice, "/users/0123456789abcdef/profile/name", Value::from("alice_01"))
//!     .unwrap();
//! vfs.drain();
//! ```

pub mod config;
pub mod feedbacks;
pub mod hooks;
pub mod reports;
pub mod shapes;
pub mod users;
pub mod vmap;

use placehub_core::{Mount, Vfs};
use placehub_kv_store::{ByteStore, DiskStore, MemStore};

pub use config::{Config, ConfigError};

/// Build the process-wide namespace from a configuration.
///
/// Registers the four mounts and the four cascade watches. Called once at
/// startup, before serving traffic; the returned [`Vfs`] is shared
/// immutably afterwards.
pub fn init(config: &Config) -> Vfs {
    Vfs::builder()
        .mount(
            Mount::new(
                "users",
                users::KEY_RULE,
                users::UserSpace::new(store(config, &config.dirs.users)),
            )
            .with_schema(shapes::user_schema()),
        )
        .mount(
            Mount::new(
                "vmap",
                vmap::KEY_RULE,
                vmap::VisitorMap::new(store(config, &config.dirs.map)),
            )
            .with_data(vmap::data_shape()),
        )
        .mount(
            Mount::new(
                "feedbacks",
                feedbacks::KEY_RULE,
                feedbacks::FeedbackIndex::new(store(config, &config.dirs.feedbacks)),
            )
            .with_data(shapes::uid()),
        )
        .mount(
            Mount::new(
                "reports",
                reports::KEY_RULE,
                reports::ReportInbox::new(store(config, &config.dirs.reports)),
            )
            .with_data(shapes::jsontime()),
        )
        .watch(hooks::places_watch(config.map.cells_per_degree))
        .watch(hooks::chats_watch())
        .watch(hooks::feedbacks_watch())
        .watch(hooks::reports_watch())
        .build()
}

fn store(config: &Config, subdir: &str) -> Box<dyn ByteStore> {
    if config.memfs {
        Box::new(MemStore::new())
    } else {
        Box::new(DiskStore::new(config.base_dir.join(subdir)))
    }
}
