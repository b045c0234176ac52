//! App Engine push-queue handler.
//!
//! App Engine delivers each task as a `POST /task_handler` with the task
//! metadata in `X-AppEngine-*` headers. Those headers are stripped from
//! external requests, so a missing task name means the caller is not the
//! queue.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};

pub const TASK_NAME_HEADER: &str = "X-AppEngine-TaskName";
pub const QUEUE_NAME_HEADER: &str = "X-AppEngine-QueueName";

pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/task_handler", post(task_handler))
}

async fn index() -> &'static str {
    "Hello, World!"
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn task_handler(headers: HeaderMap, body: Bytes) -> Response {
    let task_name = header(&headers, TASK_NAME_HEADER);
    if task_name.is_empty() {
        warn!("Invalid Task: No {} request header found", TASK_NAME_HEADER);
        return (StatusCode::BAD_REQUEST, "Bad Request - Invalid Task").into_response();
    }
    let queue_name = header(&headers, QUEUE_NAME_HEADER);
    let payload = String::from_utf8_lossy(&body);

    let output = format!(
        "Completed task: task queue({}), task name({}), payload({})",
        queue_name, task_name, payload
    );
    info!("{}", output);
    output.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn completes_task_from_queue() {
        let base = spawn().await;
        let resp = reqwest::Client::new()
            .post(format!("{}/task_handler", base))
            .header(TASK_NAME_HEADER, "task-42")
            .header(QUEUE_NAME_HEADER, "default")
            .body("hello queue")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.text().await.unwrap(),
            "Completed task: task queue(default), task name(task-42), payload(hello queue)"
        );
    }

    #[tokio::test]
    async fn rejects_requests_without_task_name() {
        let base = spawn().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/task_handler", base))
            .body("x")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(resp.text().await.unwrap(), "Bad Request - Invalid Task");

        let resp = client
            .post(format!("{}/task_handler", base))
            .header(TASK_NAME_HEADER, "")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn index_and_unknown_paths() {
        let base = spawn().await;
        let resp = reqwest::get(format!("{}/", base)).await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "Hello, World!");

        let resp = reqwest::get(format!("{}/nope", base)).await.unwrap();
        assert_eq!(resp.status(), 404);
    }
}
