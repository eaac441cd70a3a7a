//! Error handlers
//!
//! Turns errors into the single text reply a sender receives.

use std::any::Any;
use std::fmt::Display;

use crate::error::types::{BackendError, ParseError, ResolveError};

/// Prefix on every failure reply
pub const FAILURE_MARKER: &str = "❌";

/// Prefix on every successful mutation reply
pub const SUCCESS_MARKER: &str = "✅";

/// Format a failure reply
pub fn failure_reply(message: impl Display) -> String {
    format!("{} {}", FAILURE_MARKER, message)
}

/// Reply for a message the grammar rejected
pub fn parse_error_reply(err: &ParseError) -> String {
    format!(
        "{} {}\n\nSend HELP to see the available commands.",
        FAILURE_MARKER, err
    )
}

/// Reply for a path that could not be resolved.
///
/// `role` names what the path was supposed to be, e.g. "Source file".
pub fn resolution_reply(role: &str, err: &ResolveError) -> String {
    match err {
        ResolveError::NotFound { path } => failure_reply(format!("{} '{}' not found", role, path)),
        ResolveError::Ambiguous { path, name, count } => failure_reply(format!(
            "{} '{}' is ambiguous: {} matches named '{}'",
            role, path, count, name
        )),
        ResolveError::Backend {
            path,
            segment,
            source,
        } => failure_reply(format!(
            "Failed to look up {} '{}' (at '{}'): {}",
            role.to_lowercase(),
            path,
            segment,
            source
        )),
    }
}

/// Reply for a backend operation that failed after resolution succeeded
pub fn operation_reply(action: &str, err: &BackendError) -> String {
    failure_reply(format!("Failed to {}: {}", action, err))
}

/// Extract a readable message from a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_reply_mentions_role_and_path() {
        let err = ResolveError::NotFound {
            path: "/Reports/old.txt".into(),
        };
        assert_eq!(
            resolution_reply("File", &err),
            "❌ File '/Reports/old.txt' not found"
        );
    }

    #[test]
    fn test_backend_reply_lowercases_role() {
        let err = ResolveError::Backend {
            path: "/A/x.pdf".into(),
            segment: "A".into(),
            source: BackendError::Api {
                status: 500,
                message: "backend down".into(),
            },
        };
        let reply = resolution_reply("Source file", &err);
        assert!(reply.starts_with("❌ Failed to look up source file '/A/x.pdf'"));
        assert!(reply.contains("backend down"));
    }

    #[test]
    fn test_parse_error_reply_points_to_help() {
        let reply = parse_error_reply(&ParseError::UnknownCommand("FOO".into()));
        assert!(reply.starts_with("❌ Unknown command: FOO"));
        assert!(reply.contains("HELP"));
    }

    #[test]
    fn test_panic_message_downcasts() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
