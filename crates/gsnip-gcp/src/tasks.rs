//! Cloud Tasks client (v2beta2, pull queues).
//!
//! API base: `https://cloudtasks.googleapis.com/v2beta2`

use crate::client::GcpClient;
use crate::error::GcpResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "cloudtasks";
const V2BETA2: &str = "/v2beta2";

// ── Types ───────────────────────────────────────────────────────────────

/// A pull-queue task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_message: Option<PullMessage>,
    /// RFC 3339 timestamp; for leased tasks this is the lease expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullMessage {
    /// Base64 encoded payload, as carried on the wire.
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl PullMessage {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: STANDARD.encode(payload),
            tag: None,
        }
    }

    pub fn decoded_payload(&self) -> Option<Vec<u8>> {
        STANDARD.decode(&self.payload).ok()
    }
}

#[derive(Debug, Deserialize)]
struct LeaseTasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// `projects/{project}/locations/{location}/queues/{queue}`
pub fn queue_name(project: &str, location: &str, queue: &str) -> String {
    format!("projects/{}/locations/{}/queues/{}", project, location, queue)
}

// ── Cloud Tasks Client ──────────────────────────────────────────────────

pub struct CloudTasksClient;

impl CloudTasksClient {
    pub async fn create_task(client: &GcpClient, queue: &str, task: &Task) -> GcpResult<Task> {
        let path = format!("{}/{}/tasks", V2BETA2, queue);
        let body = serde_json::json!({ "task": task });
        client
            .post(SERVICE, &path, &body)
            .await
            .map_err(|e| e.with_method("tasks.create"))
    }

    /// Lease up to `max_tasks` tasks for `lease_seconds`.
    pub async fn lease_tasks(
        client: &GcpClient,
        queue: &str,
        max_tasks: u32,
        lease_seconds: u64,
    ) -> GcpResult<Vec<Task>> {
        let path = format!("{}/{}/tasks:lease", V2BETA2, queue);
        let body = serde_json::json!({
            "maxTasks": max_tasks,
            "leaseDuration": format!("{}s", lease_seconds),
            "responseView": "FULL",
        });
        let resp: LeaseTasksResponse = client
            .post(SERVICE, &path, &body)
            .await
            .map_err(|e| e.with_method("tasks.lease"))?;
        Ok(resp.tasks)
    }

    /// Acknowledge a leased task; `schedule_time` must match the lease.
    pub async fn acknowledge_task(
        client: &GcpClient,
        task_name: &str,
        schedule_time: Option<&str>,
    ) -> GcpResult<()> {
        let path = format!("{}/{}:acknowledge", V2BETA2, task_name);
        let body = serde_json::json!({ "scheduleTime": schedule_time });
        let _: serde_json::Value = client
            .post(SERVICE, &path, &body)
            .await
            .map_err(|e| e.with_method("tasks.acknowledge"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_wire_format() {
        let task = Task {
            pull_message: Some(PullMessage::new(b"hello")),
            ..Default::default()
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json, serde_json::json!({ "pullMessage": { "payload": "aGVsbG8=" } }));

        let leased: Task = serde_json::from_str(
            r#"{
                "name": "projects/p/locations/l/queues/q/tasks/1",
                "scheduleTime": "2024-01-01T00:10:00Z",
                "pullMessage": {"payload": "aGVsbG8="},
                "view": "FULL"
            }"#,
        )
        .unwrap();
        assert_eq!(leased.pull_message.unwrap().decoded_payload().unwrap(), b"hello");
        assert_eq!(leased.schedule_time.as_deref(), Some("2024-01-01T00:10:00Z"));
    }

    #[test]
    fn queue_path() {
        assert_eq!(
            queue_name("my-project", "us-central1", "pull-q"),
            "projects/my-project/locations/us-central1/queues/pull-q"
        );
    }
}
