//! The virtual namespace: mount table and router.
//!
//! Every storage operation passes through [`Vfs`]. The router parses the
//! path, resolves the mount, checks access, validates the key and the data,
//! dispatches to the handler, and - on a successful mutation - notifies the
//! watcher engine. Validation and authorization happen before any handler
//! code runs, so a rejected request has no side effects.

use std::collections::BTreeMap;
use std::sync::Mutex;

use regex::Regex;

use crate::acl::{self, AclOp, Auth};
use crate::watch::{Watch, WatchMode};
use crate::{Error, Shape, VPath, Value};

/// Backing implementation for one mount root.
///
/// Methods receive the relative key under the mount (with a leading `/`;
/// empty only for `dir` on the mount root itself) and a reference to the
/// router for re-entering *other* mounts. Capabilities are optional: the
/// default for every operation is [`Error::Unsupported`].
///
/// A handler must not re-enter its own mount through `vfs` - the mount's
/// lock is held for the duration of the call.
pub trait Handler: Send {
    fn exists(&mut self, vfs: &Vfs, key: &str) -> Result<bool, Error> {
        let _ = vfs;
        Err(unsupported("exists", key))
    }

    fn get(&mut self, vfs: &Vfs, key: &str) -> Result<Option<Value>, Error> {
        let _ = vfs;
        Err(unsupported("get", key))
    }

    fn set(&mut self, vfs: &Vfs, key: &str, data: Value) -> Result<(), Error> {
        let _ = (vfs, data);
        Err(unsupported("set", key))
    }

    fn add(&mut self, vfs: &Vfs, key: &str, data: Value) -> Result<(), Error> {
        let _ = (vfs, data);
        Err(unsupported("add", key))
    }

    fn rm(&mut self, vfs: &Vfs, key: &str) -> Result<(), Error> {
        let _ = vfs;
        Err(unsupported("rm", key))
    }

    fn dir(&mut self, vfs: &Vfs, key: &str) -> Result<Option<Vec<String>>, Error> {
        let _ = vfs;
        Err(unsupported("dir", key))
    }
}

fn unsupported(op: &'static str, key: &str) -> Error {
    Error::Unsupported {
        op,
        path: key.to_string(),
    }
}

/// One mount registration: root, key rule, optional shapes, handler.
pub struct Mount {
    root: String,
    key_rule: Regex,
    data: Option<Shape>,
    schema: Option<Shape>,
    handler: Mutex<Box<dyn Handler>>,
}

impl Mount {
    /// Register `handler` under `/root`, accepting relative keys matching
    /// `key_rule` (anchored regex over the key, leading slash included).
    pub fn new(root: &str, key_rule: &str, handler: impl Handler + 'static) -> Mount {
        Mount {
            root: root.to_string(),
            key_rule: Regex::new(key_rule).expect("invalid mount key rule"),
            data: None,
            schema: None,
            handler: Mutex::new(Box::new(handler)),
        }
    }

    /// Require every written value to match `shape`.
    pub fn with_data(mut self, shape: Shape) -> Mount {
        self.data = Some(shape);
        self
    }

    /// Require every write, re-rooted as a minimal nested document, to
    /// match the whole-namespace `shape`.
    pub fn with_schema(mut self, shape: Shape) -> Mount {
        self.schema = Some(shape);
        self
    }
}

/// Builder for the process-wide namespace.
///
/// Mounts and watches are registered once, before serving traffic begins;
/// the built [`Vfs`] is immutable apart from the watches' pending sets.
#[derive(Default)]
pub struct VfsBuilder {
    mounts: BTreeMap<String, Mount>,
    watches: Vec<Watch>,
}

impl VfsBuilder {
    /// Register a mount.
    ///
    /// # Panics
    ///
    /// Panics if the mount root is already registered - two handlers for
    /// one root is a startup bug, not a runtime condition.
    pub fn mount(mut self, mount: Mount) -> Self {
        log::info!("vfs.mount /{}", mount.root);
        let prev = self.mounts.insert(mount.root.clone(), mount);
        assert!(prev.is_none(), "mount root registered twice");
        self
    }

    /// Register a watch.
    pub fn watch(mut self, watch: Watch) -> Self {
        log::info!("vfs.watch {}", watch.name());
        self.watches.push(watch);
        self
    }

    pub fn build(self) -> Vfs {
        Vfs {
            mounts: self.mounts,
            watches: self.watches,
        }
    }
}

/// The path-routed virtual namespace.
pub struct Vfs {
    mounts: BTreeMap<String, Mount>,
    watches: Vec<Watch>,
}

impl Vfs {
    pub fn builder() -> VfsBuilder {
        VfsBuilder::default()
    }

    /// The registered mount roots, sorted.
    pub fn mount_roots(&self) -> Vec<String> {
        self.mounts.keys().cloned().collect()
    }

    /// Check whether a path exists.
    pub fn exists(&self, auth: &Auth, path: &str) -> Result<bool, Error> {
        log::debug!("vfs.exists {}", path);
        let (vpath, mount) = self.resolve(path)?;
        acl::check(AclOp::Read, auth, vpath.segments(), path)?;
        let rel = Self::checked_key(mount, &vpath)?;
        let mut handler = self.lock(mount);
        handler
            .exists(self, &rel)
            .inspect_err(|err| log::warn!("vfs.exists {} failed: {}", path, err))
    }

    /// Read the value at a path. `None` if the path does not exist.
    pub fn get(&self, auth: &Auth, path: &str) -> Result<Option<Value>, Error> {
        log::debug!("vfs.get {}", path);
        let (vpath, mount) = self.resolve(path)?;
        acl::check(AclOp::Read, auth, vpath.segments(), path)?;
        let rel = Self::checked_key(mount, &vpath)?;
        let mut handler = self.lock(mount);
        handler
            .get(self, &rel)
            .inspect_err(|err| log::warn!("vfs.get {} failed: {}", path, err))
    }

    /// Write a value at a path. [`Value::Null`] removes the path.
    pub fn set(&self, auth: &Auth, path: &str, data: Value) -> Result<(), Error> {
        log::debug!("vfs.set {}", path);
        let (vpath, mount) = self.resolve(path)?;
        acl::check(AclOp::Write, auth, vpath.segments(), path)?;
        let rel = Self::checked_key(mount, &vpath)?;
        Self::checked_data(mount, &vpath, &data)?;
        {
            let mut handler = self.lock(mount);
            handler
                .set(self, &rel, data)
                .inspect_err(|err| log::warn!("vfs.set {} failed: {}", path, err))?;
        }
        self.notify(&vpath);
        Ok(())
    }

    /// Append one item to the list-like value at a path.
    pub fn add(&self, auth: &Auth, path: &str, data: Value) -> Result<(), Error> {
        log::debug!("vfs.add {}", path);
        let (vpath, mount) = self.resolve(path)?;
        acl::check(AclOp::Write, auth, vpath.segments(), path)?;
        let rel = Self::checked_key(mount, &vpath)?;
        Self::checked_data(mount, &vpath, &data)?;
        {
            let mut handler = self.lock(mount);
            handler
                .add(self, &rel, data)
                .inspect_err(|err| log::warn!("vfs.add {} failed: {}", path, err))?;
        }
        self.notify(&vpath);
        Ok(())
    }

    /// Remove a path.
    pub fn rm(&self, auth: &Auth, path: &str) -> Result<(), Error> {
        log::debug!("vfs.rm {}", path);
        let (vpath, mount) = self.resolve(path)?;
        acl::check(AclOp::Delete, auth, vpath.segments(), path)?;
        let rel = Self::checked_key(mount, &vpath)?;
        let mut handler = self.lock(mount);
        handler
            .rm(self, &rel)
            .inspect_err(|err| log::warn!("vfs.rm {} failed: {}", path, err))
    }

    /// List the immediate children of a path.
    ///
    /// `dir` on the namespace root `/` is answered by the router itself:
    /// the registered mount roots, for any caller.
    pub fn dir(&self, auth: &Auth, path: &str) -> Result<Option<Vec<String>>, Error> {
        log::debug!("vfs.dir {}", path);
        if path == "/" {
            acl::check(AclOp::List, auth, &[], path)?;
            return Ok(Some(self.mount_roots()));
        }
        let (vpath, mount) = self.resolve(path)?;
        acl::check(AclOp::List, auth, vpath.segments(), path)?;
        let rel = vpath.rel();
        // An empty relative key names the mount root itself; the per-mount
        // rule governs keys only.
        if !rel.is_empty() && !mount.key_rule.is_match(&rel) {
            return Err(Error::BadPath {
                path: path.to_string(),
            });
        }
        let children = {
            let mut handler = self.lock(mount);
            handler
                .dir(self, &rel)
                .inspect_err(|err| log::warn!("vfs.dir {} failed: {}", path, err))?
        };
        Ok(children.map(|c| acl::filter_listing(auth, vpath.segments(), c)))
    }

    /// Flush every deferred watch that has pending changes.
    ///
    /// The embedding layer calls this once per request-processing cycle;
    /// all matching writes since the previous drain coalesce into one
    /// callback invocation per watch.
    pub fn drain(&self) {
        for watch in &self.watches {
            if watch.mode() == WatchMode::Deferred {
                watch.flush(self);
            }
        }
    }

    fn resolve<'v>(&'v self, path: &str) -> Result<(VPath, &'v Mount), Error> {
        let vpath = VPath::parse(path)?;
        let mount = self
            .mounts
            .get(vpath.root())
            .ok_or_else(|| Error::NoHandler {
                path: path.to_string(),
            })?;
        Ok((vpath, mount))
    }

    fn lock<'m>(&self, mount: &'m Mount) -> std::sync::MutexGuard<'m, Box<dyn Handler>> {
        mount.handler.lock().expect("mount handler lock")
    }

    fn checked_key(mount: &Mount, vpath: &VPath) -> Result<String, Error> {
        let rel = vpath.rel();
        if mount.key_rule.is_match(&rel) {
            Ok(rel)
        } else {
            Err(Error::BadPath {
                path: vpath.to_string(),
            })
        }
    }

    fn checked_data(mount: &Mount, vpath: &VPath, data: &Value) -> Result<(), Error> {
        if let Some(shape) = &mount.data {
            let violations = shape.validate(data);
            if let Some(first) = violations.first() {
                return Err(Error::BadData {
                    path: vpath.to_string(),
                    detail: first.to_string(),
                });
            }
        }
        if let Some(schema) = &mount.schema {
            let doc = Value::nest(&vpath.segments()[1..], data.clone());
            let violations = schema.validate(&doc);
            if let Some(first) = violations.first() {
                return Err(Error::BadData {
                    path: vpath.to_string(),
                    detail: first.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Tell the watcher engine about a completed mutation. Immediate
    /// watches flush inline, before the triggering router call returns.
    fn notify(&self, path: &VPath) {
        for watch in &self.watches {
            if watch.note(path) && watch.mode() == WatchMode::Immediate {
                watch.flush(self);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::{ChangeKey, WatchHook, WatchMask};
    use std::collections::BTreeMap as Map;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Map-backed handler implementing the full capability set.
    #[derive(Default)]
    struct TestSpace {
        data: Map<String, Value>,
        writes: Arc<AtomicUsize>,
    }

    impl Handler for TestSpace {
        fn exists(&mut self, _vfs: &Vfs, key: &str) -> Result<bool, Error> {
            Ok(self.data.contains_key(key))
        }

        fn get(&mut self, _vfs: &Vfs, key: &str) -> Result<Option<Value>, Error> {
            Ok(self.data.get(key).cloned())
        }

        fn set(&mut self, _vfs: &Vfs, key: &str, data: Value) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if data.is_null() {
                self.data.remove(key);
            } else {
                self.data.insert(key.to_string(), data);
            }
            Ok(())
        }

        fn rm(&mut self, _vfs: &Vfs, key: &str) -> Result<(), Error> {
            self.data.remove(key);
            Ok(())
        }
    }

    /// Handler with no capabilities at all.
    struct InertSpace;
    impl Handler for InertSpace {}

    fn uid_path(uid: &str, rest: &str) -> String {
        format!("/users/{}{}", uid, rest)
    }

    const ALICE: &str = "0123456789abcdef";

    fn test_vfs(writes: Arc<AtomicUsize>) -> Vfs {
        let space = TestSpace {
            data: Map::new(),
            writes,
        };
        Vfs::builder()
            .mount(Mount::new("users", r"^/[0-9a-f]{16}(/.+)?$", space))
            .mount(Mount::new("inert", r"^/.+$", InertSpace))
            .build()
    }

    #[test]
    fn root_dir_lists_mount_roots() {
        let vfs = test_vfs(Default::default());
        let roots = vfs.dir(&Auth::Anon, "/").unwrap().unwrap();
        assert_eq!(roots, vec!["inert".to_string(), "users".to_string()]);
        // Same result for any caller.
        assert_eq!(vfs.dir(&Auth::user(ALICE), "/").unwrap().unwrap(), roots);
        assert_eq!(vfs.dir(&Auth::System, "/").unwrap().unwrap(), roots);
    }

    #[test]
    fn set_get_roundtrip() {
        let vfs = test_vfs(Default::default());
        let alice = Auth::user(ALICE);
        let path = uid_path(ALICE, "/profile/name");
        vfs.set(&alice, &path, Value::from("Alice")).unwrap();
        assert_eq!(vfs.get(&alice, &path).unwrap(), Some(Value::from("Alice")));
        assert!(vfs.exists(&alice, &path).unwrap());
    }

    #[test]
    fn unknown_root_is_no_handler() {
        let vfs = test_vfs(Default::default());
        let err = vfs.get(&Auth::System, "/nowhere/at/all").unwrap_err();
        assert!(matches!(err, Error::NoHandler { .. }));
    }

    #[test]
    fn ungrammatical_path_is_invalid() {
        let vfs = test_vfs(Default::default());
        let err = vfs.get(&Auth::System, "users/abc").unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        let err = vfs.get(&Auth::System, "/users/abc/").unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn key_rule_violation_is_bad_path() {
        let vfs = test_vfs(Default::default());
        let err = vfs.get(&Auth::System, "/users/shortid").unwrap_err();
        assert!(matches!(err, Error::BadPath { .. }));
    }

    #[test]
    fn missing_capability_is_unsupported() {
        let vfs = test_vfs(Default::default());
        let err = vfs.get(&Auth::System, "/inert/anything").unwrap_err();
        assert!(matches!(err, Error::Unsupported { op: "get", .. }));
        let err = vfs
            .add(&Auth::System, "/inert/anything", Value::from(1))
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { op: "add", .. }));
    }

    #[test]
    fn denial_happens_before_any_handler_code() {
        let writes = Arc::new(AtomicUsize::new(0));
        let vfs = test_vfs(writes.clone());
        let path = uid_path(ALICE, "/profile/name");
        let err = vfs.set(&Auth::Anon, &path, Value::from("x")).unwrap_err();
        assert!(matches!(err, Error::AccessDenied { .. }));
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn data_shape_gates_writes() {
        let vfs = Vfs::builder()
            .mount(
                Mount::new("users", r"^/[0-9a-f]{16}(/.+)?$", TestSpace::default())
                    .with_data(Shape::hex(8)),
            )
            .build();
        let alice = Auth::user(ALICE);
        let path = uid_path(ALICE, "/places/latest");
        vfs.set(&alice, &path, Value::from("00f2bc17")).unwrap();
        let err = vfs.set(&alice, &path, Value::from("nope")).unwrap_err();
        assert!(matches!(err, Error::BadData { .. }));
    }

    #[test]
    fn schema_validates_synthesized_document() {
        let schema = Shape::keyval(
            Shape::hex(16),
            Shape::subset([(
                "profile",
                Shape::subset([("name", Shape::text(r"^\w{3,20}$"))]),
            )]),
        );
        let vfs = Vfs::builder()
            .mount(
                Mount::new("users", r"^/[0-9a-f]{16}(/.+)?$", TestSpace::default())
                    .with_schema(schema),
            )
            .build();
        let alice = Auth::user(ALICE);
        vfs.set(&alice, &uid_path(ALICE, "/profile/name"), Value::from("Alice"))
            .unwrap();
        // An unknown branch of the tree is rejected by the schema.
        let err = vfs
            .set(&alice, &uid_path(ALICE, "/wallet/balance"), Value::from(9))
            .unwrap_err();
        assert!(matches!(err, Error::BadData { .. }));
        // So is a value of the wrong shape at a known branch.
        let err = vfs
            .set(&alice, &uid_path(ALICE, "/profile/name"), Value::from("x"))
            .unwrap_err();
        assert!(matches!(err, Error::BadData { .. }));
    }

    // === watcher engine wiring ===

    struct CountingHook {
        calls: Arc<Mutex<Vec<Vec<ChangeKey>>>>,
    }

    impl WatchHook for CountingHook {
        fn on_changed(&self, _vfs: &Vfs, changes: &[ChangeKey]) -> Result<(), Error> {
            self.calls.lock().unwrap().push(changes.to_vec());
            Ok(())
        }
    }

    struct FailingHook;
    impl WatchHook for FailingHook {
        fn on_changed(&self, _vfs: &Vfs, _changes: &[ChangeKey]) -> Result<(), Error> {
            Err(Error::BadPath {
                path: "boom".to_string(),
            })
        }
    }

    fn watched_vfs(mode: WatchMode, calls: Arc<Mutex<Vec<Vec<ChangeKey>>>>) -> Vfs {
        Vfs::builder()
            .mount(Mount::new("users", r"^/[0-9a-f]{16}(/.+)?$", TestSpace::default()))
            .watch(Watch::new(
                "places-test",
                WatchMask::parse("/users/*/places/*/*").unwrap(),
                mode,
                |captured: &[&str]| match captured[2] {
                    "lat" | "lon" | "time" => Some(ChangeKey::new([captured[0], captured[1]])),
                    _ => None,
                },
                CountingHook { calls },
            ))
            .build()
    }

    #[test]
    fn immediate_watch_flushes_inline() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let vfs = watched_vfs(WatchMode::Immediate, calls.clone());
        let alice = Auth::user(ALICE);
        vfs.set(
            &alice,
            &uid_path(ALICE, "/places/00f2bc17/lat"),
            Value::from(51.5),
        )
        .unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn deferred_watch_coalesces_until_drain() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let vfs = watched_vfs(WatchMode::Deferred, calls.clone());
        let alice = Auth::user(ALICE);
        for prop in ["lat", "lon", "time"] {
            let path = uid_path(ALICE, &format!("/places/00f2bc17/{}", prop));
            vfs.set(&alice, &path, Value::from(1.0)).unwrap();
        }
        assert!(calls.lock().unwrap().is_empty());
        vfs.drain();
        let calls = calls.lock().unwrap();
        // Three sibling writes coalesced into one flush with one key.
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec![ChangeKey::new([ALICE, "00f2bc17"])]);
    }

    #[test]
    fn derive_none_means_irrelevant() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let vfs = watched_vfs(WatchMode::Immediate, calls.clone());
        let alice = Auth::user(ALICE);
        vfs.set(
            &alice,
            &uid_path(ALICE, "/places/00f2bc17/note"),
            Value::from("x"),
        )
        .unwrap();
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn no_notification_for_failed_writes() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let vfs = watched_vfs(WatchMode::Immediate, calls.clone());
        // Denied write: no handler ran, no watch fired.
        let err = vfs.set(
            &Auth::Anon,
            &uid_path(ALICE, "/places/00f2bc17/lat"),
            Value::from(1.0),
        );
        assert!(err.is_err());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn hook_failure_is_swallowed_and_isolated() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mask = || WatchMask::parse("/users/*/places/*/*").unwrap();
        let derive = |captured: &[&str]| Some(ChangeKey::new([captured[0]]));
        let vfs = Vfs::builder()
            .mount(Mount::new("users", r"^/[0-9a-f]{16}(/.+)?$", TestSpace::default()))
            .watch(Watch::new(
                "failing",
                mask(),
                WatchMode::Immediate,
                derive,
                FailingHook,
            ))
            .watch(Watch::new(
                "counting",
                mask(),
                WatchMode::Immediate,
                derive,
                CountingHook {
                    calls: calls.clone(),
                },
            ))
            .build();
        let alice = Auth::user(ALICE);
        // The failing hook neither fails the write nor stops the next watch.
        vfs.set(
            &alice,
            &uid_path(ALICE, "/places/00f2bc17/lat"),
            Value::from(1.0),
        )
        .unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn rm_does_not_notify() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let vfs = watched_vfs(WatchMode::Immediate, calls.clone());
        let alice = Auth::user(ALICE);
        let path = uid_path(ALICE, "/places/00f2bc17/lat");
        vfs.set(&alice, &path, Value::from(1.0)).unwrap();
        calls.lock().unwrap().clear();
        vfs.rm(&alice, &path).unwrap();
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn set_null_notifies_like_any_set() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let vfs = watched_vfs(WatchMode::Immediate, calls.clone());
        let alice = Auth::user(ALICE);
        let path = uid_path(ALICE, "/places/00f2bc17/lat");
        vfs.set(&alice, &path, Value::Null).unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(!vfs.exists(&alice, &path).unwrap());
    }

    #[test]
    #[should_panic(expected = "mount root registered twice")]
    fn duplicate_mount_roots_rejected() {
        let _ = Vfs::builder()
            .mount(Mount::new("users", "^/.+$", InertSpace))
            .mount(Mount::new("users", "^/.+$", InertSpace));
    }
}
