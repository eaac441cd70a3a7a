//! Chat command protocol
//!
//! Handles command parsing, path validation, dispatch and reply formatting.

pub mod commands;
pub mod handlers;
pub mod responses;
pub mod validation;

pub use commands::{Command, Verb, parse_command};
pub use handlers::{AuthContext, DispatchOptions, Dispatcher, Outcome};
pub use responses::HELP_TEXT;
pub use validation::{VirtualPath, validate};
