//! Command handlers module for the drive assistant.
//!
//! This module maps each parsed command onto resolver lookups and store
//! operations for one sender, and renders the outcome as the reply text.

use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::auth::SessionProvider;
use crate::config::AppConfig;
use crate::error::handlers::{
    SUCCESS_MARKER, failure_reply, operation_reply, panic_message, resolution_reply,
};
use crate::navigate::{AmbiguityPolicy, PathResolver, ResolvedObject};
use crate::protocol::responses::{
    self, HELP_TEXT, NO_DOCUMENTS, NO_SUMMARIZABLE_DOCUMENTS, sign_in_message,
};
use crate::protocol::{Command, VirtualPath};
use crate::storage::{DriveObject, ListQuery, ObjectStore};
use crate::summary::{self, FolderOutcome, Summarizer};

/// Who sent the message being executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub sender: String,
}

impl AuthContext {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

/// Settings the dispatcher needs from the application config
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub sign_in_url: String,
    pub ambiguity: AmbiguityPolicy,
    pub max_summary_chars: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            sign_in_url: "http://localhost:3000/".to_string(),
            ambiguity: AmbiguityPolicy::default(),
            max_summary_chars: 8000,
        }
    }
}

impl From<&AppConfig> for DispatchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            sign_in_url: config.server.sign_in_url.clone(),
            ambiguity: config.resolver.ambiguity,
            max_summary_chars: config.summarizer.max_chars,
        }
    }
}

/// Result of one command before it is rendered as a chat reply
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Children of a listed folder
    Listing(Vec<DriveObject>),
    /// Success or informational reply text
    Done(String),
    /// Failure reply text, already prefixed with the failure marker
    Failed(String),
    /// The sender has no usable Drive session
    SignInRequired(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Listing(_) | Outcome::Done(_))
    }

    pub fn into_reply(self) -> String {
        match self {
            Outcome::Listing(entries) => responses::format_listing(&entries),
            Outcome::Done(text) | Outcome::Failed(text) | Outcome::SignInRequired(text) => text,
        }
    }
}

/// Everything a handler needs for one command
struct CommandContext<'a> {
    store: &'a dyn ObjectStore,
    resolver: PathResolver<'a>,
    summarizer: &'a dyn Summarizer,
    max_summary_chars: usize,
}

/// Executes commands on behalf of senders.
///
/// Holds no per-sender state: the sender's session is opened from the
/// session provider at the start of each command and dropped at the end.
pub struct Dispatcher {
    sessions: Arc<dyn SessionProvider>,
    summarizer: Arc<dyn Summarizer>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        summarizer: Arc<dyn Summarizer>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            sessions,
            summarizer,
            options,
        }
    }

    /// Executes a parsed command and returns the reply text.
    ///
    /// # Arguments
    ///
    /// * `command` - The validated command to run.
    /// * `auth` - Identity of the sender; selects the Drive account.
    ///
    /// # Returns
    ///
    /// * `String` - The reply. Failures of every kind are folded into the
    ///   reply, so this never errors and never panics.
    pub fn execute(&self, command: &Command, auth: &AuthContext) -> String {
        self.run(command, auth).into_reply()
    }

    /// Executes a parsed command and returns its structured outcome.
    pub fn run(&self, command: &Command, auth: &AuthContext) -> Outcome {
        match command {
            Command::Help => handle_cmd_help(),
            _ => self.with_session(command, auth),
        }
    }

    fn with_session(&self, command: &Command, auth: &AuthContext) -> Outcome {
        let store = match self.sessions.ensure_session(&auth.sender) {
            Ok(store) => store,
            Err(e) => {
                info!("No Drive session for {}: {}", auth.sender, e);
                return Outcome::SignInRequired(sign_in_message(&self.options.sign_in_url));
            }
        };

        let ctx = CommandContext {
            store: store.as_ref(),
            resolver: PathResolver::new(store.as_ref(), self.options.ambiguity),
            summarizer: self.summarizer.as_ref(),
            max_summary_chars: self.options.max_summary_chars,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match command {
            Command::List(folder) => handle_cmd_list(&ctx, folder),
            Command::Delete(file) => handle_cmd_delete(&ctx, file),
            Command::Move {
                source,
                destination,
            } => handle_cmd_move(&ctx, source, destination),
            Command::Copy {
                source,
                destination,
            } => handle_cmd_copy(&ctx, source, destination),
            Command::FolderSummary(folder) => handle_cmd_folder_summary(&ctx, folder),
            Command::FileSummary(file) => handle_cmd_file_summary(&ctx, file),
            Command::Help => handle_cmd_help(),
        }));

        outcome.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(
                "{} for {} panicked: {}",
                command.verb().as_str(),
                auth.sender,
                message
            );
            Outcome::Failed(failure_reply(format!("Error processing command: {}", message)))
        })
    }
}

/// Handles HELP: the static help text, no session needed.
fn handle_cmd_help() -> Outcome {
    Outcome::Done(HELP_TEXT.to_string())
}

/// Handles LIST: enumerates the non-trashed children of a folder.
fn handle_cmd_list(ctx: &CommandContext<'_>, folder: &VirtualPath) -> Outcome {
    let folder = match ctx.resolver.resolve_folder(folder) {
        Ok(folder) => folder,
        Err(e) => return Outcome::Failed(resolution_reply("Folder", &e)),
    };

    match ctx.store.list(&ListQuery::children_of(folder.id())) {
        Ok(entries) => Outcome::Listing(entries),
        Err(e) => {
            warn!("Listing {} failed: {}", folder.path, e);
            Outcome::Failed(operation_reply("list files", &e))
        }
    }
}

/// Handles DELETE: removes a single file.
fn handle_cmd_delete(ctx: &CommandContext<'_>, file: &VirtualPath) -> Outcome {
    let file = match ctx.resolver.resolve_file(file) {
        Ok(file) => file,
        Err(e) => return Outcome::Failed(resolution_reply("File", &e)),
    };

    match ctx.store.delete(file.id()) {
        Ok(()) => Outcome::Done(format!(
            "{} File '{}' deleted successfully",
            SUCCESS_MARKER, file.path
        )),
        Err(e) => {
            warn!("Deleting {} failed: {}", file.path, e);
            Outcome::Failed(operation_reply("delete file", &e))
        }
    }
}

/// Resolves the source file, then the destination folder. The first
/// failure becomes the reply.
fn resolve_transfer(
    ctx: &CommandContext<'_>,
    source: &VirtualPath,
    destination: &VirtualPath,
) -> Result<(ResolvedObject, ResolvedObject), Outcome> {
    let source = ctx
        .resolver
        .resolve_file(source)
        .map_err(|e| Outcome::Failed(resolution_reply("Source file", &e)))?;
    let destination = ctx
        .resolver
        .resolve_folder(destination)
        .map_err(|e| Outcome::Failed(resolution_reply("Destination folder", &e)))?;
    Ok((source, destination))
}

/// Handles MOVE: the file ends up with the destination as its only parent.
fn handle_cmd_move(
    ctx: &CommandContext<'_>,
    source: &VirtualPath,
    destination: &VirtualPath,
) -> Outcome {
    let (file, folder) = match resolve_transfer(ctx, source, destination) {
        Ok(pair) => pair,
        Err(outcome) => return outcome,
    };

    let previous: Vec<String> = file
        .object
        .parents
        .iter()
        .filter(|p| p.as_str() != folder.id())
        .cloned()
        .collect();

    match ctx.store.reparent(file.id(), folder.id(), &previous) {
        Ok(()) => Outcome::Done(format!(
            "{} File moved from '{}' to '{}' successfully",
            SUCCESS_MARKER, source, destination
        )),
        Err(e) => {
            warn!("Moving {} to {} failed: {}", source, destination, e);
            Outcome::Failed(operation_reply("move file", &e))
        }
    }
}

/// Handles COPY: a same-named copy inside the destination folder.
fn handle_cmd_copy(
    ctx: &CommandContext<'_>,
    source: &VirtualPath,
    destination: &VirtualPath,
) -> Outcome {
    let (file, folder) = match resolve_transfer(ctx, source, destination) {
        Ok(pair) => pair,
        Err(outcome) => return outcome,
    };

    match ctx.store.copy(file.id(), folder.id(), file.name()) {
        Ok(new_id) => Outcome::Done(format!(
            "{} File '{}' copied to '{}' successfully (new file id: {})",
            SUCCESS_MARKER, source, destination, new_id
        )),
        Err(e) => {
            warn!("Copying {} to {} failed: {}", source, destination, e);
            Outcome::Failed(operation_reply("copy file", &e))
        }
    }
}

fn handle_cmd_folder_summary(ctx: &CommandContext<'_>, folder: &VirtualPath) -> Outcome {
    let folder = match ctx.resolver.resolve_folder(folder) {
        Ok(folder) => folder,
        Err(e) => return Outcome::Failed(resolution_reply("Folder", &e)),
    };

    match summary::summarize_folder(ctx.store, ctx.summarizer, &folder, ctx.max_summary_chars) {
        Ok(FolderOutcome::Summarized(summary)) => {
            Outcome::Done(responses::format_folder_summary(&summary))
        }
        Ok(FolderOutcome::EmptyFolder) => Outcome::Done(NO_DOCUMENTS.to_string()),
        Ok(FolderOutcome::NothingSummarizable) => {
            Outcome::Done(NO_SUMMARIZABLE_DOCUMENTS.to_string())
        }
        Err(e) => {
            warn!("Summarizing {} failed: {}", folder.path, e);
            Outcome::Failed(failure_reply(e))
        }
    }
}

fn handle_cmd_file_summary(ctx: &CommandContext<'_>, file: &VirtualPath) -> Outcome {
    let file = match ctx.resolver.resolve_file(file) {
        Ok(file) => file,
        Err(e) => return Outcome::Failed(resolution_reply("File", &e)),
    };

    match summary::summarize_document(ctx.store, ctx.summarizer, &file.object, ctx.max_summary_chars) {
        Ok(summary) => Outcome::Done(responses::format_file_summary(&summary)),
        Err(e) => {
            warn!("Summarizing {} failed: {}", file.path, e);
            Outcome::Failed(failure_reply(format!("Failed to summarize document: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, SummaryError};
    use crate::protocol::parse_command;
    use crate::storage::memory::MemoryStore;
    use crate::storage::results::TEXT_MIME_TYPE;
    use crate::summary::SummaryLabel;

    /// Hands out the shared memory store to "alice" only
    struct FakeSessions {
        store: MemoryStore,
    }

    impl SessionProvider for FakeSessions {
        fn has_valid_session(&self, sender: &str) -> bool {
            sender == "alice"
        }

        fn ensure_session(&self, sender: &str) -> Result<Box<dyn ObjectStore>, AuthError> {
            if self.has_valid_session(sender) {
                Ok(Box::new(self.store.clone()))
            } else {
                Err(AuthError::NoCredential(sender.to_string()))
            }
        }
    }

    struct EchoSummarizer;

    impl Summarizer for EchoSummarizer {
        fn summarize(&self, text: &str, label: &SummaryLabel) -> Result<String, SummaryError> {
            match label {
                SummaryLabel::Document(_) => Ok(format!("- {}", text)),
                SummaryLabel::Folder(path) => Ok(format!("Overview of {}", path)),
            }
        }
    }

    fn drive() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_folder("a", "A", "root")
            .add_folder("b", "B", "root")
            .add_file("x", "x.pdf", "a")
            .add_document("n", "notes.txt", TEXT_MIME_TYPE, "a", "ship it");
        store
    }

    fn run(store: &MemoryStore, sender: &str, message: &str) -> String {
        let dispatcher = Dispatcher::new(
            Arc::new(FakeSessions {
                store: store.clone(),
            }),
            Arc::new(EchoSummarizer),
            DispatchOptions::default(),
        );
        let command = parse_command(message).unwrap();
        dispatcher.execute(&command, &AuthContext::new(sender))
    }

    #[test]
    fn test_help_ignores_session() {
        let store = drive();
        assert_eq!(run(&store, "nobody", "HELP"), HELP_TEXT);
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_sign_in_required() {
        let store = drive();
        let reply = run(&store, "nobody", "LIST /A");
        assert_eq!(reply, sign_in_message(&DispatchOptions::default().sign_in_url));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_list_root_and_folder() {
        let store = drive();
        let root = run(&store, "alice", "LIST /");
        assert!(root.contains("*A*"));
        assert!(root.contains("*B*"));

        let folder = run(&store, "alice", "LIST /A");
        assert!(folder.contains("x.pdf"));
        assert!(folder.contains("notes.txt"));

        assert!(run(&store, "alice", "LIST /B").contains("No files found"));
    }

    #[test]
    fn test_delete() {
        let store = drive();
        assert_eq!(
            run(&store, "alice", "DELETE /A/x.pdf"),
            "✅ File '/A/x.pdf' deleted successfully"
        );
        assert!(store.object("x").is_none());

        let reply = run(&store, "alice", "DELETE /A/x.pdf");
        assert_eq!(reply, "❌ File '/A/x.pdf' not found");
    }

    #[test]
    fn test_move_replaces_parents() {
        let store = drive();
        assert_eq!(
            run(&store, "alice", "MOVE /A/x.pdf /B"),
            "✅ File moved from '/A/x.pdf' to '/B' successfully"
        );
        assert_eq!(store.object("x").unwrap().parents, vec!["b"]);
        assert!(store.calls().contains(&"reparent x +b -a".to_string()));
    }

    #[test]
    fn test_copy_keeps_original() {
        let store = drive();
        let reply = run(&store, "alice", "COPY /A/x.pdf /B");
        assert!(reply.starts_with("✅ File '/A/x.pdf' copied to '/B' successfully"));
        assert!(reply.contains("new file id: copy-1"));
        assert_eq!(store.object("x").unwrap().parents, vec!["a"]);
        assert_eq!(store.object("copy-1").unwrap().parents, vec!["b"]);
    }

    #[test]
    fn test_move_source_failure_short_circuits() {
        let store = drive();
        let reply = run(&store, "alice", "MOVE /A/missing.pdf /B");
        assert_eq!(reply, "❌ Source file '/A/missing.pdf' not found");
        assert!(!store.calls().iter().any(|c| c.starts_with("reparent")));
    }

    #[test]
    fn test_backend_failure_is_reported() {
        let store = drive();
        store.fail_with("rate limited");
        let reply = run(&store, "alice", "DELETE /A/x.pdf");
        assert!(reply.starts_with("❌ Failed to look up file '/A/x.pdf'"));
        assert!(reply.contains("rate limited"));
    }

    #[test]
    fn test_summaries() {
        let store = drive();
        let file = run(&store, "alice", "FILESUMMARY /A/notes.txt");
        assert_eq!(file, "📄 *notes.txt*\n\n- ship it\n\n");

        let folder = run(&store, "alice", "FOLDERSUMMARY /A");
        assert!(folder.starts_with("📁 */A Folder*"));
        assert!(folder.contains("Overview of /A"));
        assert!(folder.contains("📊 Total documents: 1"));
        assert!(folder.contains("1. *notes.txt*\n- ship it"));
        assert!(!folder.contains("x.pdf"));

        assert_eq!(run(&store, "alice", "FOLDERSUMMARY /B"), NO_DOCUMENTS);
    }

    #[test]
    fn test_structured_outcomes() {
        let store = drive();
        let dispatcher = Dispatcher::new(
            Arc::new(FakeSessions {
                store: store.clone(),
            }),
            Arc::new(EchoSummarizer),
            DispatchOptions::default(),
        );
        let alice = AuthContext::new("alice");

        match dispatcher.run(&parse_command("LIST /A").unwrap(), &alice) {
            Outcome::Listing(entries) => assert_eq!(entries.len(), 2),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let missing = dispatcher.run(&parse_command("DELETE /A/gone.pdf").unwrap(), &alice);
        assert_eq!(missing, Outcome::Failed("❌ File '/A/gone.pdf' not found".into()));
        assert!(!missing.is_success());

        let anonymous = dispatcher.run(&parse_command("LIST /A").unwrap(), &AuthContext::new("nobody"));
        assert!(matches!(anonymous, Outcome::SignInRequired(_)));

        assert!(dispatcher.run(&Command::Help, &alice).is_success());
    }
}
