//! Fake Google REST endpoints served by a local axum app.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use gsnip_gcp::{ClientConfig, CredentialsSource, GcpClient};
use serde_json::Value;
use std::sync::Arc;

pub const PROJECT: &str = "test-project";

/// A request as the fake sees it.
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub body: Value,
}

/// Start `router` on an ephemeral port and return a client pointed at it.
pub async fn client_for(router: Router) -> Arc<GcpClient> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    let config = ClientConfig::default()
        .with_project(PROJECT)
        .with_endpoint(format!("http://{}", addr))
        .with_credentials(CredentialsSource::StaticToken("test-token".into()));
    Arc::new(GcpClient::new(config).unwrap())
}

/// Route every request through `handle`; Google paths such as
/// `projects/p:commit` do not fit axum's path syntax.
pub fn fake<F>(handle: F) -> Router
where
    F: Fn(Call) -> Response + Clone + Send + Sync + 'static,
{
    Router::new().fallback(move |method: Method, uri: Uri, body: Bytes| {
        let handle = handle.clone();
        async move {
            let body = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&body).unwrap_or(Value::Null)
            };
            handle(Call {
                method,
                path: uri.path().to_string(),
                query: uri.query().unwrap_or("").to_string(),
                body,
            })
        }
    })
}

pub fn json(value: Value) -> Response {
    axum::Json(value).into_response()
}

pub fn api_error(code: u16, status: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": { "code": code, "status": status, "message": message }
    });
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        axum::Json(body),
    )
        .into_response()
}
