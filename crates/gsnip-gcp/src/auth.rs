//! OAuth2 access tokens for Google Cloud APIs.
//!
//! Three token sources are supported:
//!
//! 1. Service account keys: build an RS256 JWT, POST it to the token
//!    endpoint and receive an access token with an expiry
//!    (<https://developers.google.com/identity/protocols/oauth2/service-account>).
//! 2. The metadata server available on GCE, Cloud Run and App Engine.
//! 3. A static bearer token.
//!
//! Tokens are cached and refreshed 60 s before they expire.

use crate::config::{CredentialsSource, ServiceAccountKey};
use crate::error::{GcpError, GcpResult};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const METADATA_HOST: &str = "metadata.google.internal";
const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    /// Issuer, the service account email.
    iss: String,
    /// Space-separated scopes.
    scope: String,
    /// Audience, the token endpoint.
    aud: String,
    exp: i64,
    iat: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// An OAuth2 access token with metadata.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

impl AccessToken {
    /// Expired, or within 60 s of expiring.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at - 60
    }
}

#[derive(Debug)]
enum TokenSource {
    ServiceAccount(ServiceAccountKey),
    Metadata { host: String },
    Static(String),
}

/// Cached token manager.
#[derive(Debug)]
pub struct TokenManager {
    source: TokenSource,
    scopes: Vec<String>,
    cached_token: Option<AccessToken>,
    http_client: Client,
}

impl TokenManager {
    pub fn new(
        credentials: &CredentialsSource,
        scopes: Vec<String>,
        http_client: Client,
    ) -> GcpResult<Self> {
        let source = match credentials {
            CredentialsSource::KeyFile(path) => {
                TokenSource::ServiceAccount(ServiceAccountKey::from_file(path)?)
            }
            CredentialsSource::ServiceAccount(key) => TokenSource::ServiceAccount(key.clone()),
            CredentialsSource::MetadataServer => TokenSource::Metadata {
                host: std::env::var("GCE_METADATA_HOST")
                    .unwrap_or_else(|_| METADATA_HOST.to_string()),
            },
            CredentialsSource::StaticToken(token) => TokenSource::Static(token.clone()),
        };
        Ok(Self {
            source,
            scopes,
            cached_token: None,
            http_client,
        })
    }

    /// Get a valid access token, refreshing if needed.
    pub async fn get_token(&mut self) -> GcpResult<String> {
        if let Some(ref token) = self.cached_token {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }
        let token = match self.source {
            TokenSource::ServiceAccount(ref key) => self.exchange_jwt(key).await?,
            TokenSource::Metadata { ref host } => self.fetch_metadata_token(host).await?,
            TokenSource::Static(ref token) => return Ok(token.clone()),
        };
        let result = token.token.clone();
        self.cached_token = Some(token);
        Ok(result)
    }

    /// Project id embedded in a service account key, if any.
    pub fn key_project_id(&self) -> Option<&str> {
        match self.source {
            TokenSource::ServiceAccount(ref key) if !key.project_id.is_empty() => {
                Some(key.project_id.as_str())
            }
            _ => None,
        }
    }

    async fn exchange_jwt(&self, key: &ServiceAccountKey) -> GcpResult<AccessToken> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: key.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: key.token_uri.clone(),
            exp: now + 3600,
            iat: now,
        };
        let header = Header {
            alg: Algorithm::RS256,
            kid: Some(key.private_key_id.clone()),
            ..Default::default()
        };

        // Keys pasted through env vars often carry escaped newlines.
        let pem = key.private_key.replace("\\n", "\n");
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| GcpError::auth_error(&format!("Failed to load private key: {}", e)))?;
        let jwt = encode(&header, &claims, &encoding_key)
            .map_err(|e| GcpError::auth_error(&format!("Failed to encode JWT: {}", e)))?;

        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];
        debug!("exchanging JWT for {} at {}", key.client_email, key.token_uri);
        let response = self
            .http_client
            .post(&key.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| GcpError::auth_error(&format!("Token exchange request failed: {}", e)))?;

        self.read_token(response, now).await
    }

    async fn fetch_metadata_token(&self, host: &str) -> GcpResult<AccessToken> {
        let now = Utc::now().timestamp();
        let url = format!("http://{}{}", host, METADATA_TOKEN_PATH);
        let scopes = self.scopes.join(",");
        debug!("fetching access token from metadata server {}", host);
        let response = self
            .http_client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", scopes.as_str())])
            .send()
            .await
            .map_err(|e| GcpError::auth_error(&format!("Metadata server unreachable: {}", e)))?;

        self.read_token(response, now).await
    }

    async fn read_token(&self, response: reqwest::Response, now: i64) -> GcpResult<AccessToken> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GcpError::auth_error(&format!(
                "Token request failed (HTTP {}): {}",
                status, body
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GcpError::auth_error(&format!("Failed to parse token response: {}", e)))?;
        Ok(AccessToken {
            token: token.access_token,
            expires_at: now + token.expires_in.unwrap_or(3600),
        })
    }
}
