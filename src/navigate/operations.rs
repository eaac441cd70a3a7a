//! Path resolution implementation

use log::{debug, warn};

use crate::error::ResolveError;
use crate::navigate::results::{AmbiguityPolicy, ResolvedObject};
use crate::protocol::VirtualPath;
use crate::storage::{DriveObject, ListQuery, ObjectKind, ObjectStore};

/// Maps virtual paths onto store objects.
///
/// Every call walks the path from scratch; nothing is cached between calls
/// since the store may change between messages.
pub struct PathResolver<'a> {
    store: &'a dyn ObjectStore,
    policy: AmbiguityPolicy,
}

impl<'a> PathResolver<'a> {
    pub fn new(store: &'a dyn ObjectStore, policy: AmbiguityPolicy) -> Self {
        Self { store, policy }
    }

    /// Resolves a folder path. `/` is the root and costs no remote call.
    pub fn resolve_folder(&self, path: &VirtualPath) -> Result<ResolvedObject, ResolveError> {
        if path.is_root() {
            return Ok(ResolvedObject {
                path: path.clone(),
                object: DriveObject::root(),
            });
        }
        self.walk(path, ObjectKind::Folder)
    }

    /// Resolves a file path. A file always lives inside some folder, so a
    /// single-segment path never names one.
    pub fn resolve_file(&self, path: &VirtualPath) -> Result<ResolvedObject, ResolveError> {
        if path.segments().len() < 2 {
            return Err(not_found(path));
        }
        self.walk(path, ObjectKind::File)
    }

    /// One lookup per segment, left to right. Intermediate segments are
    /// folders; the last segment has the requested kind.
    fn walk(&self, path: &VirtualPath, kind: ObjectKind) -> Result<ResolvedObject, ResolveError> {
        let segments = path.segments();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(not_found(path));
        }

        let last = segments.len() - 1;
        let mut parent: Option<String> = None;
        let mut current = None;

        for (i, segment) in segments.iter().enumerate() {
            let segment_kind = if i == last { kind } else { ObjectKind::Folder };
            let object = self.lookup(path, parent.as_deref(), segment, segment_kind)?;
            debug!("Resolved segment '{}' of {} to {}", segment, path, object.id);
            parent = Some(object.id.clone());
            current = Some(object);
        }

        current
            .map(|object| ResolvedObject {
                path: path.clone(),
                object,
            })
            .ok_or_else(|| not_found(path))
    }

    /// Looks up `name` of `kind`, under `parent` or anywhere for the first
    /// segment, and applies the ambiguity policy.
    fn lookup(
        &self,
        path: &VirtualPath,
        parent: Option<&str>,
        name: &str,
        kind: ObjectKind,
    ) -> Result<DriveObject, ResolveError> {
        let query = ListQuery {
            parent: parent.map(str::to_string),
            name: Some(name.to_string()),
            kind: Some(kind),
        };

        let mut matches = self.store.list(&query).map_err(|source| ResolveError::Backend {
            path: path.to_string(),
            segment: name.to_string(),
            source,
        })?;

        match matches.len() {
            0 => Err(not_found(path)),
            1 => Ok(matches.remove(0)),
            count => match self.policy {
                AmbiguityPolicy::Reject => Err(ResolveError::Ambiguous {
                    path: path.to_string(),
                    name: name.to_string(),
                    count,
                }),
                AmbiguityPolicy::FirstMatch => {
                    warn!(
                        "{} objects named '{}' while resolving {}; using {}",
                        count, name, path, matches[0].id
                    );
                    Ok(matches.remove(0))
                }
            },
        }
    }
}

fn not_found(path: &VirtualPath) -> ResolveError {
    ResolveError::NotFound {
        path: path.to_string(),
    }
}
