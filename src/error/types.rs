//! Error types
//!
//! Defines domain-specific error types for each stage of command handling.

use thiserror::Error;

/// Command grammar errors. The display text is what the sender sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty message received")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{verb} command requires {requirement}")]
    Arity {
        verb: &'static str,
        requirement: &'static str,
    },

    #[error("Invalid {role} path format: {path}")]
    InvalidPath { role: &'static str, path: String },

    #[error("Error parsing command: {0}")]
    Internal(String),
}

/// Failures talking to the remote object store
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedContent(String),

    #[error("Content extraction failed: {0}")]
    Extraction(String),
}

/// Virtual path resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("'{path}' not found")]
    NotFound { path: String },

    #[error("'{path}' is ambiguous: {count} objects named '{name}'")]
    Ambiguous {
        path: String,
        name: String,
        count: usize,
    },

    #[error("lookup of '{segment}' in '{path}' failed: {source}")]
    Backend {
        path: String,
        segment: String,
        #[source]
        source: BackendError,
    },
}

impl ResolveError {
    pub fn path(&self) -> &str {
        match self {
            ResolveError::NotFound { path }
            | ResolveError::Ambiguous { path, .. }
            | ResolveError::Backend { path, .. } => path,
        }
    }
}

/// Authentication and credential persistence errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid sender: {0}")]
    InvalidSender(String),

    #[error("No stored credential for {0}")]
    NoCredential(String),

    #[error("Credential for {0} expired and has no refresh token")]
    Expired(String),

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("Client secrets unavailable: {0}")]
    ClientSecrets(String),

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed credential: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Document summarization errors
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Document '{0}' is empty or could not be read")]
    EmptyDocument(String),

    #[error("Failed to get document content: {0}")]
    Content(#[from] BackendError),

    #[error("Failed to list folder: {0}")]
    Listing(#[source] BackendError),

    #[error("Failed to generate AI summary: {0}")]
    Generation(String),

    #[error("Summarizer is not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to generate any summaries")]
    NoneSucceeded,
}

/// Startup failures; nothing after startup is fatal
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Startup task failed: {0}")]
    Startup(String),
}
