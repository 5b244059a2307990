//! The watcher engine: path-mask subscriptions with coalesced flushing.
//!
//! A watch subscribes to writes matching a path mask. Matching writes are
//! folded into a pending set of [`ChangeKey`]s; a flush hands the whole
//! accumulated set to the watch's hook in one call. Immediate watches flush
//! inline with the triggering write; deferred watches flush when the router
//! drains them, coalescing rapid successive writes (e.g. the three sibling
//! fields of one place record) into a single derived-write pass.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::{Error, VPath, Vfs};

/// When a watch's pending set is flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchMode {
    /// Flush synchronously, inside the triggering write.
    Immediate,
    /// Flush on the next [`Vfs::drain`], coalescing everything pending.
    Deferred,
}

/// A path template where `*` matches exactly one segment.
#[derive(Clone, Debug)]
pub struct WatchMask {
    segments: Vec<MaskSeg>,
}

#[derive(Clone, Debug)]
enum MaskSeg {
    Literal(String),
    Wildcard,
}

impl WatchMask {
    /// Parse a mask such as `/users/*/places/*/*`.
    pub fn parse(mask: &str) -> Result<WatchMask, Error> {
        let path_like = mask.replace('*', "x");
        VPath::parse(&path_like)?;
        let segments = mask[1..]
            .split('/')
            .map(|seg| {
                if seg == "*" {
                    MaskSeg::Wildcard
                } else {
                    MaskSeg::Literal(seg.to_string())
                }
            })
            .collect();
        Ok(WatchMask { segments })
    }

    /// Match a concrete path, returning the wildcard captures in order.
    pub fn captures<'p>(&self, path: &'p VPath) -> Option<Vec<&'p str>> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut captured = Vec::new();
        for (mask_seg, path_seg) in self.segments.iter().zip(path.segments()) {
            match mask_seg {
                MaskSeg::Literal(lit) if lit == path_seg => {}
                MaskSeg::Literal(_) => return None,
                MaskSeg::Wildcard => captured.push(path_seg.as_str()),
            }
        }
        Some(captured)
    }
}

/// A structured deduplication key: one derived unit of work.
///
/// Built from captured path segments; two writes deriving the same key are
/// coalesced into a single hook invocation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChangeKey(Vec<String>);

impl ChangeKey {
    /// Build a key from captured segments.
    pub fn new<I, S>(parts: I) -> ChangeKey
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ChangeKey(parts.into_iter().map(Into::into).collect())
    }

    /// The captured segments, in mask order.
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

/// Callback run with the accumulated change set of one watch.
///
/// Hooks re-enter the router as [`Auth::System`](crate::Auth::System) to
/// perform derived writes. A hook failure is logged and swallowed: it never
/// fails the triggering write and never stops other watches.
pub trait WatchHook: Send + Sync {
    fn on_changed(&self, vfs: &Vfs, changes: &[ChangeKey]) -> Result<(), Error>;
}

type DeriveFn = Box<dyn Fn(&[&str]) -> Option<ChangeKey> + Send + Sync>;

/// One watch registration: mask, key derivation, mode, hook.
///
/// Registered once at startup and never mutated; only the pending set
/// changes, behind its own lock.
pub struct Watch {
    name: &'static str,
    mask: WatchMask,
    mode: WatchMode,
    derive: DeriveFn,
    hook: Box<dyn WatchHook>,
    pending: Mutex<HashSet<ChangeKey>>,
}

impl Watch {
    /// Create a watch. `derive` maps the wildcard captures of a matching
    /// write to a dedup key, or `None` when that write is irrelevant to
    /// this watch even though the path matched the mask.
    pub fn new(
        name: &'static str,
        mask: WatchMask,
        mode: WatchMode,
        derive: impl Fn(&[&str]) -> Option<ChangeKey> + Send + Sync + 'static,
        hook: impl WatchHook + 'static,
    ) -> Watch {
        Watch {
            name,
            mask,
            mode,
            derive: Box::new(derive),
            hook: Box::new(hook),
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// The registration name, used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn mode(&self) -> WatchMode {
        self.mode
    }

    /// Note a completed write. Returns true if the watch now has pending
    /// work (the caller flushes immediately for [`WatchMode::Immediate`]).
    pub(crate) fn note(&self, path: &VPath) -> bool {
        let Some(captured) = self.mask.captures(path) else {
            return false;
        };
        let Some(key) = (self.derive)(&captured) else {
            return false;
        };
        log::debug!("watch {}: pending {:?}", self.name, key);
        let mut pending = self.pending.lock().expect("watch pending lock");
        pending.insert(key);
        true
    }

    /// Flush the pending set, if any.
    ///
    /// The set is taken under the lock and the hook runs outside it, so a
    /// flush sees a consistent snapshot and clears exactly what it saw.
    pub(crate) fn flush(&self, vfs: &Vfs) {
        let batch: Vec<ChangeKey> = {
            let mut pending = self.pending.lock().expect("watch pending lock");
            if pending.is_empty() {
                return;
            }
            pending.drain().collect()
        };
        log::debug!("watch {}: flushing {} change(s)", self.name, batch.len());
        if let Err(err) = self.hook.on_changed(vfs, &batch) {
            log::warn!("watch {} failed: {}", self.name, err);
        }
    }
}
