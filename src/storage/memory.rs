//! In-memory store used by unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::BackendError;
use crate::storage::results::{DriveObject, ListQuery, ObjectKind, PDF_MIME_TYPE, FOLDER_MIME_TYPE};
use crate::storage::ObjectStore;

#[derive(Debug, Default)]
struct Inner {
    objects: Vec<DriveObject>,
    contents: HashMap<String, String>,
    calls: Vec<String>,
    failing: Option<String>,
    next_id: usize,
}

/// Shared handle; clones see the same objects and call log.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: &str) -> &Self {
        self.add(id, name, ObjectKind::Folder, FOLDER_MIME_TYPE, parent)
    }

    pub fn add_file(&self, id: &str, name: &str, parent: &str) -> &Self {
        self.add(id, name, ObjectKind::File, PDF_MIME_TYPE, parent)
    }

    pub fn add_document(&self, id: &str, name: &str, mime_type: &str, parent: &str, text: &str) -> &Self {
        self.add(id, name, ObjectKind::File, mime_type, parent);
        self.lock().contents.insert(id.to_string(), text.to_string());
        self
    }

    fn add(&self, id: &str, name: &str, kind: ObjectKind, mime_type: &str, parent: &str) -> &Self {
        self.lock().objects.push(DriveObject {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            mime_type: mime_type.to_string(),
            size: Some(1024),
            modified_time: None,
            parents: vec![parent.to_string()],
        });
        self
    }

    /// Makes every call fail with an API error carrying `message`
    pub fn fail_with(&self, message: &str) {
        self.lock().failing = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn object(&self, id: &str) -> Option<DriveObject> {
        self.lock().objects.iter().find(|o| o.id == id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn record(&self, call: String) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        match &inner.failing {
            Some(message) => Err(BackendError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl ObjectStore for MemoryStore {
    fn list(&self, query: &ListQuery) -> Result<Vec<DriveObject>, BackendError> {
        self.record(format!("list {}", query.to_drive_query()))?;
        Ok(self
            .lock()
            .objects
            .iter()
            .filter(|o| query.matches(o))
            .cloned()
            .collect())
    }

    fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.record(format!("delete {}", id))?;
        self.lock().objects.retain(|o| o.id != id);
        Ok(())
    }

    fn reparent(&self, id: &str, add_parent: &str, remove_parents: &[String]) -> Result<(), BackendError> {
        self.record(format!("reparent {} +{} -{}", id, add_parent, remove_parents.join(",")))?;
        let mut inner = self.lock();
        if let Some(object) = inner.objects.iter_mut().find(|o| o.id == id) {
            object.parents.retain(|p| !remove_parents.contains(p));
            if !object.parents.iter().any(|p| p == add_parent) {
                object.parents.push(add_parent.to_string());
            }
        }
        Ok(())
    }

    fn copy(&self, id: &str, new_parent: &str, name: &str) -> Result<String, BackendError> {
        self.record(format!("copy {} -> {}", id, new_parent))?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let new_id = format!("copy-{}", inner.next_id);
        let original = inner.objects.iter().find(|o| o.id == id).cloned();
        if let Some(mut copy) = original {
            copy.id = new_id.clone();
            copy.name = name.to_string();
            copy.parents = vec![new_parent.to_string()];
            inner.objects.push(copy);
        }
        Ok(new_id)
    }

    fn get_content(&self, object: &DriveObject) -> Result<String, BackendError> {
        self.record(format!("content {}", object.id))?;
        Ok(self.lock().contents.get(&object.id).cloned().unwrap_or_default())
    }
}
