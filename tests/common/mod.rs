//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use drive_assistant::auth::{AccountLinker, SessionProvider};
use drive_assistant::error::{AuthError, BackendError, SummaryError};
use drive_assistant::protocol::{DispatchOptions, Dispatcher};
use drive_assistant::server::{AppState, MessageLimits};
use drive_assistant::storage::results::{FOLDER_MIME_TYPE, PDF_MIME_TYPE, TEXT_MIME_TYPE};
use drive_assistant::storage::{DriveObject, ListQuery, ObjectKind, ObjectStore};
use drive_assistant::summary::{SummaryLabel, Summarizer};
use std::time::Duration;

pub const SIGN_IN_URL: &str = "https://drive.example.test/connect";

#[derive(Default)]
struct SpyState {
    objects: Vec<DriveObject>,
    contents: Vec<(String, String)>,
    calls: Vec<String>,
}

/// Object store that records every call it receives
#[derive(Clone, Default)]
pub struct SpyStore {
    state: Arc<Mutex<SpyState>>,
}

impl SpyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder(&self, id: &str, name: &str, parent: &str) -> &Self {
        self.insert(id, name, FOLDER_MIME_TYPE, parent)
    }

    pub fn file(&self, id: &str, name: &str, parent: &str) -> &Self {
        self.insert(id, name, PDF_MIME_TYPE, parent)
    }

    pub fn text(&self, id: &str, name: &str, parent: &str, content: &str) -> &Self {
        self.insert(id, name, TEXT_MIME_TYPE, parent);
        self.state
            .lock()
            .unwrap()
            .contents
            .push((id.to_string(), content.to_string()));
        self
    }

    fn insert(&self, id: &str, name: &str, mime_type: &str, parent: &str) -> &Self {
        self.state.lock().unwrap().objects.push(DriveObject {
            id: id.to_string(),
            name: name.to_string(),
            kind: ObjectKind::from_mime_type(mime_type),
            mime_type: mime_type.to_string(),
            size: Some(2048),
            modified_time: None,
            parents: vec![parent.to_string()],
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(operation))
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl ObjectStore for SpyStore {
    fn list(&self, query: &ListQuery) -> Result<Vec<DriveObject>, BackendError> {
        self.record(format!("list {}", query.to_drive_query()));
        let state = self.state.lock().unwrap();
        Ok(state.objects.iter().filter(|o| query.matches(o)).cloned().collect())
    }

    fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.record(format!("delete {}", id));
        self.state.lock().unwrap().objects.retain(|o| o.id != id);
        Ok(())
    }

    fn reparent(&self, id: &str, add_parent: &str, remove_parents: &[String]) -> Result<(), BackendError> {
        self.record(format!("reparent {} +{} -{}", id, add_parent, remove_parents.join(",")));
        Ok(())
    }

    fn copy(&self, id: &str, new_parent: &str, _name: &str) -> Result<String, BackendError> {
        self.record(format!("copy {} -> {}", id, new_parent));
        Ok(format!("{}-copy", id))
    }

    fn get_content(&self, object: &DriveObject) -> Result<String, BackendError> {
        self.record(format!("content {}", object.id));
        let state = self.state.lock().unwrap();
        Ok(state
            .contents
            .iter()
            .find(|(id, _)| id == &object.id)
            .map(|(_, text)| text.clone())
            .unwrap_or_default())
    }
}

/// Sessions for a fixed set of signed-in senders, all sharing one store
#[derive(Clone)]
pub struct FakeSessions {
    store: SpyStore,
    signed_in: Arc<Mutex<HashSet<String>>>,
}

impl FakeSessions {
    pub fn new(store: SpyStore, signed_in: &[&str]) -> Self {
        Self {
            store,
            signed_in: Arc::new(Mutex::new(signed_in.iter().map(|s| s.to_string()).collect())),
        }
    }
}

impl SessionProvider for FakeSessions {
    fn has_valid_session(&self, sender: &str) -> bool {
        self.signed_in.lock().unwrap().contains(sender)
    }

    fn ensure_session(&self, sender: &str) -> Result<Box<dyn ObjectStore>, AuthError> {
        if self.has_valid_session(sender) {
            Ok(Box::new(self.store.clone()))
        } else {
            Err(AuthError::NoCredential(sender.to_string()))
        }
    }
}

impl AccountLinker for FakeSessions {
    fn sign_in(&self, code: &str, sender: &str) -> Result<(), AuthError> {
        if code == "bad-code" {
            return Err(AuthError::TokenRequest("invalid_grant: Bad Request".into()));
        }
        self.signed_in.lock().unwrap().insert(sender.to_string());
        Ok(())
    }

    fn disconnect(&self, sender: &str) -> Result<(), AuthError> {
        self.signed_in.lock().unwrap().remove(sender);
        Ok(())
    }
}

/// Summarizes a document as its first line
pub struct FirstLineSummarizer;

impl Summarizer for FirstLineSummarizer {
    fn summarize(&self, text: &str, label: &SummaryLabel) -> Result<String, SummaryError> {
        match label {
            SummaryLabel::Document(_) => Ok(format!("- {}", text.lines().next().unwrap_or_default())),
            SummaryLabel::Folder(path) => Ok(format!("Documents from {}", path)),
        }
    }
}

pub fn options() -> DispatchOptions {
    DispatchOptions {
        sign_in_url: SIGN_IN_URL.to_string(),
        ..DispatchOptions::default()
    }
}

pub fn dispatcher(sessions: &FakeSessions) -> Dispatcher {
    dispatcher_with(sessions, options())
}

pub fn dispatcher_with(sessions: &FakeSessions, options: DispatchOptions) -> Dispatcher {
    Dispatcher::new(Arc::new(sessions.clone()), Arc::new(FirstLineSummarizer), options)
}

pub fn app_state(sessions: &FakeSessions, rate_limit: usize) -> AppState {
    AppState::new(
        dispatcher(sessions),
        Arc::new(sessions.clone()),
        Arc::new(sessions.clone()),
        MessageLimits {
            max_message_length: 200,
            rate_limit_max_messages: rate_limit,
            rate_limit_window: Duration::from_secs(60),
        },
    )
}
