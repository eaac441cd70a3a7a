//! Authentication system
//!
//! Handles sender validation, credential persistence, OAuth token exchange
//! and per-sender Drive sessions.

pub mod credentials;
pub mod oauth;
pub mod session;
pub mod validator;

pub use credentials::{Credential, CredentialStore, create_store, sanitize_sender};
pub use session::{AccountLinker, SessionManager, SessionProvider};
pub use validator::validate_sender;
