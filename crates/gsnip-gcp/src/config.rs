//! Client configuration and credential discovery.
//!
//! Credentials are resolved in the same order the Google client libraries
//! use for Application Default Credentials: an explicit key file, then
//! `GOOGLE_APPLICATION_CREDENTIALS`, then the GCE metadata server.

use crate::error::{GcpError, GcpResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scope requested when the caller does not ask for anything narrower.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Environment variables consulted for the default project, in order.
pub const PROJECT_ENV_VARS: &[&str] = &[
    "GOOGLE_CLOUD_PROJECT",
    "GOLANG_SAMPLES_PROJECT_ID",
    "GCLOUD_PROJECT",
];

// ── Service Account Key ─────────────────────────────────────────────────

/// Parsed service account key JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub r#type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub universe_domain: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> GcpResult<Self> {
        let key: Self = serde_json::from_str(json).map_err(|e| {
            GcpError::auth_error(&format!("Invalid service account key JSON: {}", e))
        })?;
        key.validate()?;
        Ok(key)
    }

    pub fn from_file(path: &Path) -> GcpResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GcpError::auth_error(&format!("Cannot read key file {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Validate the key has the fields the JWT flow needs.
    pub fn validate(&self) -> GcpResult<()> {
        if self.r#type != "service_account" {
            return Err(GcpError::auth_error(&format!(
                "Expected type 'service_account', got '{}'",
                self.r#type
            )));
        }
        for (field, value) in [
            ("private_key", &self.private_key),
            ("client_email", &self.client_email),
            ("token_uri", &self.token_uri),
        ] {
            if value.is_empty() {
                return Err(GcpError::auth_error(&format!("{} is empty", field)));
            }
        }
        Ok(())
    }
}

// ── Credentials source ──────────────────────────────────────────────────

/// Where a client obtains its bearer tokens.
#[derive(Debug, Clone)]
pub enum CredentialsSource {
    /// Service account key file on disk.
    KeyFile(PathBuf),
    /// Already-parsed service account key.
    ServiceAccount(ServiceAccountKey),
    /// GCE / Cloud Run / App Engine metadata server.
    MetadataServer,
    /// Fixed bearer token (emulators, tests, `gcloud auth print-access-token`).
    StaticToken(String),
}

impl CredentialsSource {
    /// Application Default Credentials discovery.
    pub fn from_env() -> Self {
        match std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            Ok(path) if !path.is_empty() => Self::KeyFile(PathBuf::from(path)),
            _ => Self::MetadataServer,
        }
    }
}

// ── Client config ───────────────────────────────────────────────────────

/// Configuration for a [`GcpClient`](crate::client::GcpClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project used when a call does not name one explicitly.
    pub project_id: Option<String>,
    pub credentials: CredentialsSource,
    pub scopes: Vec<String>,
    /// Replaces `https://{service}.googleapis.com` (emulators, tests).
    pub endpoint_override: Option<String>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            credentials: CredentialsSource::MetadataServer,
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
            endpoint_override: None,
            user_agent: format!("gsnip/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// ADC credentials plus the project from the usual environment variables.
    pub fn from_env() -> Self {
        Self {
            project_id: project_from_env(),
            credentials: CredentialsSource::from_env(),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialsSource) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }
}

/// First non-empty project variable from [`PROJECT_ENV_VARS`].
pub fn project_from_env() -> Option<String> {
    PROJECT_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.is_empty())
}
