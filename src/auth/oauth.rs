//! OAuth 2.0 token endpoint calls
//!
//! Authorization code exchange at sign-in and refresh-token grants when a
//! stored access token runs out.

use chrono::{Duration, Utc};
use log::{debug, info};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::auth::credentials::{Credential, DEFAULT_TOKEN_URI, DRIVE_SCOPE};
use crate::error::AuthError;

/// Scopes requested for a new sign-in
pub const SIGN_IN_SCOPES: [&str; 4] = [
    DRIVE_SCOPE,
    "https://www.googleapis.com/auth/drive.metadata.readonly",
    "https://www.googleapis.com/auth/userinfo.email",
    "openid",
];

/// OAuth client identity from the Google console download
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The console wraps the client in a `web` or `installed` section
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    web: Option<ClientSecrets>,
    installed: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretsFile = serde_json::from_str(json)?;
        file.web
            .or(file.installed)
            .ok_or_else(|| AuthError::ClientSecrets("no 'web' or 'installed' section".into()))
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = fs::read_to_string(path)
            .map_err(|e| AuthError::ClientSecrets(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
}

impl OAuthClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Trades an authorization code for a fresh credential
    pub fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError> {
        let scopes = SIGN_IN_SCOPES.join(" ");
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("scope", scopes.as_str()),
        ];
        let token = self.request_token(&secrets.token_uri, &form)?;
        info!("Authorization code exchanged for client {}", secrets.client_id);

        let scopes = token
            .scope
            .as_deref()
            .map(split_scopes)
            .unwrap_or_else(|| SIGN_IN_SCOPES.iter().map(|s| s.to_string()).collect());
        Ok(Credential {
            token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes,
            expiry: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    /// Returns `credential` with a new access token. The refresh token is
    /// kept unless the server rotates it.
    pub fn refresh_credential(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::TokenRequest("credential has no refresh token".into()))?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
        ];
        let token = self.request_token(&credential.token_uri, &form)?;
        debug!("Access token refreshed for client {}", credential.client_id);

        let mut refreshed = credential.clone();
        refreshed.token = token.access_token;
        refreshed.expiry = token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(rotated) = token.refresh_token {
            refreshed.refresh_token = Some(rotated);
        }
        if let Some(scope) = token.scope.as_deref() {
            refreshed.scopes = split_scopes(scope);
        }
        Ok(refreshed)
    }

    fn request_token(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self.http.post(token_uri).form(form).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or_else(|_| status.to_string());
            return Err(AuthError::TokenRequest(reason));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn split_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}
