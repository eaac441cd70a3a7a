//! Credential storage and management
//!
//! Persists one OAuth credential per sender, either as JSON files or as
//! base64 values in the process environment.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::config::{CredentialBackend, CredentialConfig};
use crate::error::AuthError;

/// A credential stops being usable this long before it actually expires
pub const EXPIRY_MARGIN_SECS: i64 = 60;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Drive access scope requested at sign-in
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// An authorized user credential, stored in Google's `authorized_user` layout
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credential {
    /// True while the access token has more than the safety margin left.
    /// A credential without an expiry never expires.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty()
            && self
                .expiry
                .is_none_or(|expiry| expiry - Duration::seconds(EXPIRY_MARGIN_SECS) > now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Persisted credentials keyed by sender identity
pub trait CredentialStore: Send + Sync {
    fn save(&self, sender: &str, credential: &Credential) -> Result<(), AuthError>;

    /// `Ok(None)` when the sender never signed in
    fn load(&self, sender: &str) -> Result<Option<Credential>, AuthError>;

    /// Deleting a missing credential succeeds
    fn delete(&self, sender: &str) -> Result<(), AuthError>;

    fn exists(&self, sender: &str) -> bool;
}

/// Makes a sender identity safe for file and variable names.
///
/// ASCII letters and digits are kept; every other byte becomes `_XX` in
/// upper-case hex, so distinct senders never share a key.
/// `whatsapp:+1 555-0100` becomes `whatsapp_3A_2B1_20555_2D0100`.
pub fn sanitize_sender(sender: &str) -> String {
    let mut out = String::with_capacity(sender.len());
    for byte in sender.bytes() {
        if byte.is_ascii_alphanumeric() {
            out.push(byte as char);
        } else {
            let _ = write!(out, "_{:02X}", byte);
        }
    }
    out
}

/// Builds the store selected in configuration
pub fn create_store(config: &CredentialConfig) -> Arc<dyn CredentialStore> {
    match config.backend {
        CredentialBackend::File => {
            info!("Storing credentials in {}", config.storage_dir);
            Arc::new(FileCredentialStore::new(config.storage_path()))
        }
        CredentialBackend::Environment => {
            info!("Storing credentials in environment variables prefixed {}", config.prefix);
            Arc::new(EnvCredentialStore::new(&config.prefix))
        }
    }
}

/// One `token_<sender>.json` file per sender
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, sender: &str) -> PathBuf {
        self.dir.join(format!("token_{}.json", sanitize_sender(sender)))
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, sender: &str, credential: &Credential) -> Result<(), AuthError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(sender);
        fs::write(&path, serde_json::to_vec(credential)?)?;
        debug!("Saved credential file {}", path.display());
        Ok(())
    }

    fn load(&self, sender: &str) -> Result<Option<Credential>, AuthError> {
        let path = self.path_for(sender);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn delete(&self, sender: &str) -> Result<(), AuthError> {
        let path = self.path_for(sender);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn exists(&self, sender: &str) -> bool {
        self.path_for(sender).exists()
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Credentials as base64 JSON in `<prefix>TOKEN_<sender>` variables.
///
/// Values are read from the process environment; writes and deletes land
/// in an in-process overlay that shadows it, since the environment itself
/// is not safely mutable from a multi-threaded server.
pub struct EnvCredentialStore {
    prefix: String,
    lookup: EnvLookup,
    overlay: RwLock<HashMap<String, Option<String>>>,
}

impl EnvCredentialStore {
    pub fn new(prefix: &str) -> Self {
        Self::with_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Store reading from `lookup` instead of the process environment
    pub fn with_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            prefix: prefix.to_string(),
            lookup: Box::new(lookup),
            overlay: RwLock::new(HashMap::new()),
        }
    }

    pub fn key_for(&self, sender: &str) -> String {
        format!("{}TOKEN_{}", self.prefix, sanitize_sender(sender))
    }

    fn read(&self, key: &str) -> Result<Option<String>, AuthError> {
        let overlay = self
            .overlay
            .read()
            .map_err(|_| AuthError::Store("credential overlay lock poisoned".into()))?;
        match overlay.get(key) {
            Some(value) => Ok(value.clone()),
            None => Ok((self.lookup)(key)),
        }
    }

    fn write(&self, key: String, value: Option<String>) -> Result<(), AuthError> {
        self.overlay
            .write()
            .map_err(|_| AuthError::Store("credential overlay lock poisoned".into()))?
            .insert(key, value);
        Ok(())
    }
}

impl CredentialStore for EnvCredentialStore {
    fn save(&self, sender: &str, credential: &Credential) -> Result<(), AuthError> {
        let encoded = BASE64.encode(serde_json::to_vec(credential)?);
        self.write(self.key_for(sender), Some(encoded))
    }

    fn load(&self, sender: &str) -> Result<Option<Credential>, AuthError> {
        let Some(encoded) = self.read(&self.key_for(sender))? else {
            return Ok(None);
        };
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| AuthError::Store(format!("credential is not valid base64: {}", e)))?;
        Ok(Some(serde_json::from_slice(&decoded)?))
    }

    fn delete(&self, sender: &str) -> Result<(), AuthError> {
        self.write(self.key_for(sender), None)
    }

    fn exists(&self, sender: &str) -> bool {
        matches!(self.read(&self.key_for(sender)), Ok(Some(_)))
    }
}
