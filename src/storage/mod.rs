//! Remote object storage
//!
//! The `ObjectStore` seam the resolver and dispatcher talk to, the Drive v3
//! implementation behind it, and document text extraction.

pub mod drive;
pub mod extract;
#[cfg(test)]
pub(crate) mod memory;
pub mod results;

pub use drive::DriveClient;
pub use results::{DriveObject, ListQuery, ObjectKind, ROOT_ID};

use crate::error::BackendError;

/// Operations every remote store offers, addressed by object id.
///
/// Implementations are per-session: each one is already bound to a single
/// sender's credential.
pub trait ObjectStore {
    /// Every object matching `query`, across all result pages
    fn list(&self, query: &ListQuery) -> Result<Vec<DriveObject>, BackendError>;

    fn delete(&self, id: &str) -> Result<(), BackendError>;

    /// Adds `add_parent` and drops every id in `remove_parents`
    fn reparent(&self, id: &str, add_parent: &str, remove_parents: &[String])
    -> Result<(), BackendError>;

    /// Copies `id` into `new_parent` under `name`, returning the new id
    fn copy(&self, id: &str, new_parent: &str, name: &str) -> Result<String, BackendError>;

    /// Plain text of a document, extracted according to its mime type
    fn get_content(&self, object: &DriveObject) -> Result<String, BackendError>;
}
