//! Storage result types
//!
//! Defines the object records returned by the store and the query used to
//! list them.

use chrono::{DateTime, Utc};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const GOOGLE_DOC_MIME_TYPE: &str = "application/vnd.google-apps.document";
pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME_TYPE: &str = "text/plain";

/// Id of the store root
pub const ROOT_ID: &str = "root";

/// Whether an object is a leaf or a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    File,
    Folder,
}

impl ObjectKind {
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            ObjectKind::Folder
        } else {
            ObjectKind::File
        }
    }
}

/// A file or folder in the remote store
#[derive(Debug, Clone, PartialEq)]
pub struct DriveObject {
    pub id: String,
    pub name: String,
    pub kind: ObjectKind,
    pub mime_type: String,
    pub size: Option<u64>,
    pub modified_time: Option<DateTime<Utc>>,
    pub parents: Vec<String>,
}

impl DriveObject {
    /// The store root, resolved without a remote call
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            name: "/".to_string(),
            kind: ObjectKind::Folder,
            mime_type: FOLDER_MIME_TYPE.to_string(),
            size: None,
            modified_time: None,
            parents: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ObjectKind::Folder
    }

    /// PDF, DOCX, Google Docs and plain text can be read for summaries
    pub fn is_summarizable(&self) -> bool {
        is_summarizable(&self.mime_type)
    }
}

pub fn is_summarizable(mime_type: &str) -> bool {
    matches!(
        mime_type,
        PDF_MIME_TYPE | DOCX_MIME_TYPE | GOOGLE_DOC_MIME_TYPE | TEXT_MIME_TYPE
    )
}

/// Filter for a list call. Trashed objects are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub parent: Option<String>,
    pub name: Option<String>,
    pub kind: Option<ObjectKind>,
}

impl ListQuery {
    /// Every non-trashed child of `parent_id`
    pub fn children_of(parent_id: &str) -> Self {
        Self {
            parent: Some(parent_id.to_string()),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn of_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Renders the filter in the Drive `q` query language.
    pub fn to_drive_query(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(parent) = &self.parent {
            clauses.push(format!("'{}' in parents", escape_literal(parent)));
        }
        if let Some(name) = &self.name {
            clauses.push(format!("name = '{}'", escape_literal(name)));
        }
        match self.kind {
            Some(ObjectKind::Folder) => clauses.push(format!("mimeType = '{}'", FOLDER_MIME_TYPE)),
            Some(ObjectKind::File) => clauses.push(format!("mimeType != '{}'", FOLDER_MIME_TYPE)),
            None => {}
        }
        clauses.push("trashed = false".to_string());
        clauses.join(" and ")
    }

    /// Whether `object` satisfies the filter. Used by in-memory stores.
    pub fn matches(&self, object: &DriveObject) -> bool {
        self.parent
            .as_ref()
            .is_none_or(|p| object.parents.iter().any(|op| op == p))
            && self.name.as_ref().is_none_or(|n| &object.name == n)
            && self.kind.is_none_or(|k| object.kind == k)
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
