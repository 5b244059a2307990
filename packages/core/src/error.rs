//! Error types surfaced by the virtual namespace.

use placehub_kv_store::KvError;

/// Stable, low-cardinality classification of an [`Error`].
///
/// The transport layer maps these to its own status codes; the core never
/// deals in HTTP statuses directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The virtual path fails the global grammar.
    InvalidPath,
    /// No mount is registered for the path's root segment.
    NoHandler,
    /// The resolved handler does not implement the requested operation.
    Unsupported,
    /// The path is grammatical but rejected by the mount's own key rule.
    BadPath,
    /// The value fails the mount's value shape or namespace schema.
    BadData,
    /// The access policy rejects the (operation, caller, path) triple.
    AccessDenied,
    /// Opaque backing-store failure.
    Store,
}

/// Errors surfaced to callers of the virtual namespace.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    #[error("no handler for {path}")]
    NoHandler { path: String },

    #[error("not supported: {op} on {path}")]
    Unsupported { op: &'static str, path: String },

    #[error("bad path: {path}")]
    BadPath { path: String },

    #[error("bad data at {path}: {detail}")]
    BadData { path: String, detail: String },

    #[error("no access: {op} {path}")]
    AccessDenied { op: &'static str, path: String },

    #[error("store error: {0}")]
    Store(#[from] KvError),

    #[error("data decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPath { .. } => ErrorKind::InvalidPath,
            Error::NoHandler { .. } => ErrorKind::NoHandler,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::BadPath { .. } => ErrorKind::BadPath,
            Error::BadData { .. } => ErrorKind::BadData,
            Error::AccessDenied { .. } => ErrorKind::AccessDenied,
            Error::Store(_) | Error::Json(_) => ErrorKind::Store,
        }
    }
}
