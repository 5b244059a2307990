//! Error type for the byte layer.
//!
//! Errors at this level are transport-focused. No semantic errors like
//! "invalid path format" or "access denied" - those belong in higher layers.

/// Errors from a [`ByteStore`](crate::ByteStore) implementation.
#[derive(thiserror::Error, Debug)]
pub enum KvError {
    /// I/O failure from the underlying storage.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The key is not usable by this store (empty, escapes the base
    /// directory, etc). The key itself is reported for diagnostics.
    #[error("bad storage key: {key}")]
    BadKey { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: KvError = io_err.into();
        assert!(matches!(err, KvError::Io(_)));
        assert!(err.to_string().contains("i/o"));
    }

    #[test]
    fn bad_key_reports_key() {
        let err = KvError::BadKey {
            key: "../escape".to_string(),
        };
        assert!(err.to_string().contains("../escape"));
    }
}
