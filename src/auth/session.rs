//! Per-sender Drive sessions
//!
//! A session is rebuilt from the credential store on every call and dropped
//! afterwards; nothing about a sender is cached in memory.

use log::{info, warn};
use reqwest::blocking::Client;
use std::path::Path;
use std::sync::Arc;

use crate::auth::credentials::{Credential, CredentialStore};
use crate::auth::oauth::{ClientSecrets, OAuthClient};
use crate::config::GoogleConfig;
use crate::error::AuthError;
use crate::storage::{DriveClient, ObjectStore};

/// Answers whether a sender can reach their Drive, and opens it
pub trait SessionProvider: Send + Sync {
    /// True when a stored credential is valid or can be refreshed
    fn has_valid_session(&self, sender: &str) -> bool;

    /// A store bound to the sender's account, refreshing the credential
    /// first when it has expired
    fn ensure_session(&self, sender: &str) -> Result<Box<dyn ObjectStore>, AuthError>;
}

/// Links and unlinks a sender's Drive account
pub trait AccountLinker: Send + Sync {
    fn sign_in(&self, code: &str, sender: &str) -> Result<(), AuthError>;

    fn disconnect(&self, sender: &str) -> Result<(), AuthError>;
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    oauth: OAuthClient,
    http: Client,
    google: GoogleConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, http: Client, google: GoogleConfig) -> Self {
        Self {
            store,
            oauth: OAuthClient::new(http.clone()),
            http,
            google,
        }
    }

    fn client_secrets(&self) -> Result<ClientSecrets, AuthError> {
        let path = self
            .google
            .client_secrets_file
            .as_deref()
            .ok_or_else(|| AuthError::ClientSecrets("google.client_secrets_file is not set".into()))?;
        ClientSecrets::from_file(Path::new(path))
    }

    /// The stored credential, refreshed and re-persisted if it expired
    fn usable_credential(&self, sender: &str) -> Result<Credential, AuthError> {
        let credential = self
            .store
            .load(sender)?
            .ok_or_else(|| AuthError::NoCredential(sender.to_string()))?;

        if credential.is_valid() {
            return Ok(credential);
        }
        if !credential.can_refresh() {
            return Err(AuthError::Expired(sender.to_string()));
        }

        let refreshed = self.oauth.refresh_credential(&credential)?;
        self.store.save(sender, &refreshed)?;
        info!("Refreshed Drive credential for {}", sender);
        Ok(refreshed)
    }

    fn drive_client(&self, credential: &Credential) -> DriveClient {
        DriveClient::new(
            self.http.clone(),
            &self.google.api_base,
            &credential.token,
            self.google.page_size,
        )
    }
}

impl SessionProvider for SessionManager {
    fn has_valid_session(&self, sender: &str) -> bool {
        match self.store.load(sender) {
            Ok(Some(credential)) => credential.is_valid() || credential.can_refresh(),
            Ok(None) => false,
            Err(e) => {
                warn!("Unreadable credential for {}: {}", sender, e);
                false
            }
        }
    }

    fn ensure_session(&self, sender: &str) -> Result<Box<dyn ObjectStore>, AuthError> {
        let credential = self.usable_credential(sender)?;
        Ok(Box::new(self.drive_client(&credential)))
    }
}

impl AccountLinker for SessionManager {
    fn sign_in(&self, code: &str, sender: &str) -> Result<(), AuthError> {
        let secrets = self.client_secrets()?;
        let credential = self
            .oauth
            .exchange_code(&secrets, code, &self.google.redirect_uri)?;
        self.store.save(sender, &credential)?;
        info!("Drive account linked for {}", sender);
        Ok(())
    }

    fn disconnect(&self, sender: &str) -> Result<(), AuthError> {
        self.store.delete(sender)?;
        info!("Drive account unlinked for {}", sender);
        Ok(())
    }
}
