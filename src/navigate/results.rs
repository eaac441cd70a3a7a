//! Result types for path resolution

use serde::Deserialize;

use crate::protocol::VirtualPath;
use crate::storage::{DriveObject, ObjectKind};

/// What to do when several siblings share the requested name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Take the first match the store returns and log a warning
    #[default]
    FirstMatch,
    /// Fail with `ResolveError::Ambiguous`
    Reject,
}

/// A virtual path bound to the object it names
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedObject {
    pub path: VirtualPath,
    pub object: DriveObject,
}

impl ResolvedObject {
    pub fn id(&self) -> &str {
        &self.object.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.object.kind
    }

    pub fn name(&self) -> &str {
        &self.object.name
    }
}
