//! Configuration management for the drive assistant
//!
//! Settings come from built-in defaults, an optional `config.toml` and
//! `DRIVE_ASSISTANT__SECTION__KEY` environment overrides, in that order.

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::navigate::AmbiguityPolicy;

/// Environment variable naming an alternative config file (without extension).
pub const CONFIG_PATH_ENV: &str = "DRIVE_ASSISTANT_CONFIG";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DRIVE_ASSISTANT";

/// Fallback variable for the Gemini key, matching the name Google documents.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Complete application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub credentials: CredentialConfig,
    pub google: GoogleConfig,
    pub summarizer: SummarizerConfig,
    pub resolver: ResolverConfig,
}

/// HTTP transport settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address the webhook listens on
    pub bind_address: String,

    /// Port the webhook listens on
    pub port: u16,

    /// Requests executed at the same time; further requests wait for a slot
    pub max_concurrent_requests: usize,

    /// Longest accepted chat message, in bytes
    pub max_message_length: usize,

    /// Link sent to senders that have not connected a Drive account
    pub sign_in_url: String,

    /// Messages a single sender may send per window
    pub rate_limit_max_messages: usize,
    pub rate_limit_window_secs: u64,
}

/// Where per-sender OAuth credentials are persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    File,
    Environment,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialConfig {
    pub backend: CredentialBackend,

    /// Variable prefix for the environment backend
    pub prefix: String,

    /// Directory holding `token_<sender>.json` files for the file backend
    pub storage_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GoogleConfig {
    /// OAuth client secrets JSON downloaded from the Google console
    pub client_secrets_file: Option<String>,
    pub redirect_uri: String,
    pub api_base: String,
    pub page_size: u32,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,

    /// Document text beyond this many characters is cut before summarizing
    pub max_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    pub ambiguity: AmbiguityPolicy,
}

impl AppConfig {
    /// Load configuration from config.toml (optional) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config".to_string());

        let builder = defaults()?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let mut config = Self::build(builder)?;
        if config.summarizer.api_key.is_none() {
            config.summarizer.api_key = std::env::var(GEMINI_KEY_ENV).ok();
        }
        Ok(config)
    }

    /// Load configuration from a TOML document layered over the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::build(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".into()));
        }

        if self.server.max_concurrent_requests == 0 {
            return Err(ConfigError::Message(
                "server.max_concurrent_requests must be greater than 0".into(),
            ));
        }

        if self.server.max_message_length == 0 {
            return Err(ConfigError::Message(
                "server.max_message_length must be greater than 0".into(),
            ));
        }

        if self.server.rate_limit_max_messages == 0 {
            return Err(ConfigError::Message(
                "server.rate_limit_max_messages must be greater than 0".into(),
            ));
        }

        if self.server.rate_limit_window_secs == 0 {
            return Err(ConfigError::Message(
                "server.rate_limit_window_secs must be greater than 0".into(),
            ));
        }

        if self.credentials.backend == CredentialBackend::File
            && self.credentials.storage_dir.trim().is_empty()
        {
            return Err(ConfigError::Message(
                "credentials.storage_dir cannot be empty with the file backend".into(),
            ));
        }

        if self.google.page_size == 0 {
            return Err(ConfigError::Message(
                "google.page_size must be greater than 0".into(),
            ));
        }

        if self.summarizer.max_chars == 0 {
            return Err(ConfigError::Message(
                "summarizer.max_chars must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Get bind address and port as a socket address string
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

impl CredentialConfig {
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_dir)
    }
}

impl GoogleConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.bind_address", "127.0.0.1")?
        .set_default("server.port", 5000_i64)?
        .set_default("server.max_concurrent_requests", 8_i64)?
        .set_default("server.max_message_length", 1600_i64)?
        .set_default("server.sign_in_url", "http://localhost:3000/")?
        .set_default("server.rate_limit_max_messages", 20_i64)?
        .set_default("server.rate_limit_window_secs", 60_i64)?
        .set_default("credentials.backend", "file")?
        .set_default("credentials.prefix", "STORAGE_")?
        .set_default("credentials.storage_dir", "./tmp")?
        .set_default("google.redirect_uri", "http://localhost:3000")?
        .set_default("google.api_base", "https://www.googleapis.com/drive/v3")?
        .set_default("google.page_size", 100_i64)?
        .set_default("google.http_timeout_secs", 30_i64)?
        .set_default("summarizer.model", "gemini-2.0-flash")?
        .set_default(
            "summarizer.api_base",
            "https://generativelanguage.googleapis.com/v1beta",
        )?
        .set_default("summarizer.max_chars", 8000_i64)?
        .set_default("resolver.ambiguity", "first_match")
}
