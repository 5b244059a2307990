//! Virtual path type with validated segments.

use std::fmt;

use crate::Error;

/// A validated absolute path into the virtual namespace.
///
/// Paths are slash-separated, always start with `/` and never end with one.
/// Segments are restricted to word characters and hyphens - hyphens are
/// admitted because timestamp keys such as `2015-01-02-12-30-00` appear as
/// path segments. The first segment names the mount root; the remainder is
/// the relative key handed to that mount's handler.
///
/// A `VPath` is pure data: once constructed it never changes.
///
/// # Examples
///
/// ```rust
/// use placehub_core::VPath;
///
/// let p = VPath::parse("/users/0123456789abcdef/profile/name").unwrap();
/// assert_eq!(p.root(), "users");
/// assert_eq!(p.rel(), "/0123456789abcdef/profile/name");
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VPath {
    segments: Vec<String>,
}

fn valid_segment(seg: &str) -> bool {
    !seg.is_empty()
        && seg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl VPath {
    /// Parse a path string, validating every segment.
    ///
    /// Fails with [`Error::InvalidPath`] unless the string matches
    /// `(/segment)+`: a leading slash, at least one segment, no trailing
    /// slash, no empty segments.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err(Error::InvalidPath {
                path: s.to_string(),
            });
        };
        if rest.is_empty() {
            return Err(Error::InvalidPath {
                path: s.to_string(),
            });
        }
        let segments: Vec<String> = rest.split('/').map(str::to_string).collect();
        if !segments.iter().all(|seg| valid_segment(seg)) {
            return Err(Error::InvalidPath {
                path: s.to_string(),
            });
        }
        Ok(VPath { segments })
    }

    /// Build a path from pre-validated segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || !segments.iter().all(|seg| valid_segment(seg)) {
            return Err(Error::InvalidPath {
                path: format!("/{}", segments.join("/")),
            });
        }
        Ok(VPath { segments })
    }

    /// The mount root: the first segment.
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// The relative key under the mount root, with a leading `/`.
    ///
    /// Empty when the path names the mount root itself.
    pub fn rel(&self) -> String {
        self.segments[1..]
            .iter()
            .map(|seg| format!("/{}", seg))
            .collect()
    }

    /// All segments, mount root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a parsed path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for VPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

/// Macro for path literals known to be valid.
///
/// # Example
///
/// ```rust
/// use placehub_core::vpath;
///
/// let p = vpath!("/users/0123456789abcdef");
/// assert_eq!(p.root(), "users");
/// ```
#[macro_export]
macro_rules! vpath {
    ($s:expr) => {
        $crate::VPath::parse($s).expect("invalid path literal")
    };
}
