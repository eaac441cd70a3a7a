//! Path validation
//!
//! Syntactic checks for the slash-separated virtual paths senders type.
//! Nothing here touches the store; see `navigate` for resolution.

use std::fmt;

/// Characters Drive clients commonly refuse in names; never valid in a path
pub const FORBIDDEN_PATH_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// Returns true if `path` is a syntactically valid virtual path.
///
/// The path must be non-empty, start with `/` and contain none of
/// [`FORBIDDEN_PATH_CHARS`]. No normalization is applied: repeated and
/// trailing slashes are kept as typed.
pub fn validate(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }

    if !path.starts_with('/') {
        return false;
    }

    !path.contains(FORBIDDEN_PATH_CHARS)
}

/// A virtual path that passed [`validate`]. `/` is the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Validates `raw` and wraps it, or returns `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        validate(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Name segments after the leading slash. Empty for the root; empty
    /// strings appear where slashes repeat or trail.
    pub fn segments(&self) -> Vec<&str> {
        if self.is_root() {
            return Vec::new();
        }
        self.0[1..].split('/').collect()
    }

    /// The last segment, or `/` for the root.
    pub fn file_name(&self) -> &str {
        self.segments().last().copied().unwrap_or("/")
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
