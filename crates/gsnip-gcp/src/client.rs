//! Base Google Cloud HTTP client.
//!
//! All the REST surfaces used here follow one pattern:
//! - Base URL: `https://{service}.googleapis.com`
//! - Auth: `Authorization: Bearer {access_token}`
//! - Request/Response: JSON
//! - Long-running operations: poll until `done`
//!
//! `GcpClient` handles token acquisition, error parsing and operation
//! polling. It is cheap to share behind an `Arc`; the token cache
//! sits behind its own lock.

use crate::auth::TokenManager;
use crate::config::ClientConfig;
use crate::error::{GcpError, GcpResult};
use log::{debug, warn};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;

/// Base Google Cloud API client.
#[derive(Debug)]
pub struct GcpClient {
    http: Client,
    token_manager: Mutex<TokenManager>,
    project_id: Option<String>,
    endpoint_override: Option<String>,
    user_agent: String,
}

impl GcpClient {
    pub fn new(config: ClientConfig) -> GcpResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| GcpError::internal("http", &format!("HTTP client: {}", e)))?;

        let token_manager =
            TokenManager::new(&config.credentials, config.scopes.clone(), http.clone())?;
        let project_id = config
            .project_id
            .clone()
            .or_else(|| token_manager.key_project_id().map(str::to_string));

        Ok(Self {
            http,
            token_manager: Mutex::new(token_manager),
            project_id,
            endpoint_override: config.endpoint_override,
            user_agent: config.user_agent,
        })
    }

    /// Default project, from the config or the service account key.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    fn base_url(&self, service: &str) -> String {
        match self.endpoint_override {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.googleapis.com", service),
        }
    }

    pub async fn token(&self) -> GcpResult<String> {
        self.token_manager.lock().await.get_token().await
    }

    // ── Generic REST methods ────────────────────────────────────────

    async fn send<B, T>(
        &self,
        method: Method,
        service: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> GcpResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url(service), path);
        let token = self.token().await?;
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&token)
            .header("User-Agent", &self.user_agent)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GcpError::internal(service, &format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GcpError::internal(service, &format!("Body read error: {}", e)))?;
        if status >= 400 {
            return Err(GcpError::from_api_response(service, status, &text));
        }

        // Several methods (acknowledge, commit, rollback) answer with an empty body.
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text)
            .map_err(|e| GcpError::internal(service, &format!("JSON parse error: {}", e)))
    }

    /// GET and deserialize the JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        service: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> GcpResult<T> {
        self.send::<(), T>(Method::GET, service, path, query, None).await
    }

    /// POST JSON and deserialize the response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        service: &str,
        path: &str,
        body: &B,
    ) -> GcpResult<T> {
        self.send(Method::POST, service, path, &[], Some(body)).await
    }

    /// PATCH JSON (with e.g. an `updateMask` query) and deserialize the response.
    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        service: &str,
        path: &str,
        body: &B,
        query: &[(&str, &str)],
    ) -> GcpResult<T> {
        self.send(Method::PATCH, service, path, query, Some(body)).await
    }

    // ── Operation polling ───────────────────────────────────────────

    /// Poll a long-running operation (`GET {path}`) until it reports `done`.
    pub async fn wait_for_operation(
        &self,
        service: &str,
        operation_path: &str,
        max_polls: u32,
        poll_interval: Duration,
    ) -> GcpResult<serde_json::Value> {
        for _ in 0..max_polls {
            let op: serde_json::Value = self.get(service, operation_path, &[]).await?;

            let done = op.get("done").and_then(|v| v.as_bool()).unwrap_or(false);
            // Compute Engine style operations report `status: DONE` instead.
            let status = op.get("status").and_then(|v| v.as_str()).unwrap_or("");

            if done || status == "DONE" {
                if let Some(err) = op.get("error") {
                    let msg = err
                        .get("message")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Operation failed");
                    let code = err.get("code").and_then(|v| v.as_u64()).unwrap_or(500) as u16;
                    return Err(GcpError::new(service, code, "OPERATION_FAILED", msg));
                }
                return Ok(op);
            }

            tokio::time::sleep(poll_interval).await;
        }

        warn!("{} operation {} still running after {} polls", service, operation_path, max_polls);
        Err(GcpError::deadline_exceeded(
            service,
            "Operation timed out waiting for completion",
        ))
    }
}

/// Doubling backoff used by hand-rolled status polling loops.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { next: initial, max }
    }

    /// Starts at 1 s and doubles up to 16 s.
    pub fn doubling() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(16))
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }
}
