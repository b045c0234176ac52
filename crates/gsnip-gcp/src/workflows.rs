//! Workflows and Workflow Executions clients.
//!
//! API bases:
//! - `https://workflows.googleapis.com/v1`
//! - `https://workflowexecutions.googleapis.com/v1`

use crate::client::GcpClient;
use crate::error::{GcpError, GcpResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const WORKFLOWS: &str = "workflows";
const EXECUTIONS: &str = "workflowexecutions";
const V1: &str = "/v1";

// ── Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `ACTIVE`, `UNAVAILABLE` or `STATE_UNSPECIFIED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_contents: Option<String>,
}

impl Workflow {
    pub fn is_active(&self) -> bool {
        self.state.as_deref() == Some("ACTIVE")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionError {
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// `ACTIVE`, `SUCCEEDED`, `FAILED`, `CANCELLED`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl Execution {
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("STATE_UNSPECIFIED")
    }

    pub fn is_active(&self) -> bool {
        self.state() == "ACTIVE"
    }
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
}

/// `projects/{project}/locations/{location}/workflows/{workflow}`
pub fn workflow_name(project: &str, location: &str, workflow: &str) -> String {
    format!("projects/{}/locations/{}/workflows/{}", project, location, workflow)
}

// ── Workflows Client ────────────────────────────────────────────────────

pub struct WorkflowsClient;

impl WorkflowsClient {
    pub async fn get_workflow(client: &GcpClient, name: &str) -> GcpResult<Workflow> {
        let path = format!("{}/{}", V1, name);
        client
            .get(WORKFLOWS, &path, &[])
            .await
            .map_err(|e| e.with_method("workflows.get"))
    }

    /// Create a workflow and wait for the deploy operation to finish.
    pub async fn create_workflow(
        client: &GcpClient,
        project: &str,
        location: &str,
        workflow_id: &str,
        source_contents: &str,
    ) -> GcpResult<()> {
        let path = format!(
            "{}/projects/{}/locations/{}/workflows?workflowId={}",
            V1, project, location, workflow_id
        );
        let body = Workflow {
            source_contents: Some(source_contents.to_string()),
            ..Default::default()
        };
        let op: Operation = client
            .post(WORKFLOWS, &path, &body)
            .await
            .map_err(|e| e.with_method("workflows.create"))?;
        client
            .wait_for_operation(
                WORKFLOWS,
                &format!("{}/{}", V1, op.name),
                60,
                Duration::from_secs(2),
            )
            .await
            .map_err(|e| e.with_method("workflows.create"))?;
        Ok(())
    }
}

// ── Executions Client ───────────────────────────────────────────────────

pub struct ExecutionsClient;

impl ExecutionsClient {
    /// Start an execution of `workflow` (a full workflow resource name).
    pub async fn create_execution(
        client: &GcpClient,
        workflow: &str,
        argument: Option<&str>,
    ) -> GcpResult<Execution> {
        let path = format!("{}/{}/executions", V1, workflow);
        let body = Execution {
            argument: argument.map(str::to_string),
            ..Default::default()
        };
        client
            .post(EXECUTIONS, &path, &body)
            .await
            .map_err(|e| e.with_method("executions.create"))
    }

    pub async fn get_execution(client: &GcpClient, name: &str) -> GcpResult<Execution> {
        let path = format!("{}/{}", V1, name);
        client
            .get(EXECUTIONS, &path, &[])
            .await
            .map_err(|e| e.with_method("executions.get"))
    }
}

/// Error for an execution that finished in a state other than `SUCCEEDED`.
pub fn execution_failure(execution: &Execution) -> GcpError {
    let detail = execution
        .error
        .as_ref()
        .map(|e| e.payload.clone())
        .unwrap_or_default();
    GcpError::new(
        EXECUTIONS,
        500,
        execution.state(),
        &format!("execution {} finished: {}", execution.name, detail),
    )
}
