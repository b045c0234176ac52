//! Workflows quickstart: deploy the sample definition, run it, wait for the
//! result.

use crate::error::GsnipResult;
use gsnip_gcp::workflows::{execution_failure, workflow_name, ExecutionsClient, WorkflowsClient};
use gsnip_gcp::{Backoff, GcpClient, GcpResult};
use log::info;
use std::io::Write;

pub const DEFAULT_WORKFLOW: &str = "myFirstWorkflow";

/// Looks up today's weekday and searches Wikipedia for it.
pub const MY_FIRST_WORKFLOW: &str = r#"- getCurrentTime:
    call: http.get
    args:
      url: https://us-central1-workflowsample.cloudfunctions.net/datetime
    result: currentTime
- readWikipedia:
    call: http.get
    args:
      url: https://en.wikipedia.org/w/api.php
      query:
        action: opensearch
        search: ${currentTime.body.dayOfTheWeek}
    result: wikiResult
- returnResult:
    return: ${wikiResult.body[1]}
"#;

/// Create `workflow_id` from [`MY_FIRST_WORKFLOW`] unless an `ACTIVE`
/// workflow of that name already exists. Returns whether it was created.
pub async fn deploy_workflow(
    client: &GcpClient,
    project: &str,
    location: &str,
    workflow_id: &str,
) -> GcpResult<bool> {
    let name = workflow_name(project, location, workflow_id);
    match WorkflowsClient::get_workflow(client, &name).await {
        Ok(existing) if existing.is_active() => {
            info!("{} already deployed", name);
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }
    info!("deploying {}", name);
    WorkflowsClient::create_workflow(client, project, location, workflow_id, MY_FIRST_WORKFLOW)
        .await?;
    Ok(true)
}

/// Start an execution and poll it with doubling backoff until it leaves
/// `ACTIVE`. Returns the execution result on `SUCCEEDED`.
pub async fn execute_workflow<W: Write + Send>(
    client: &GcpClient,
    project: &str,
    location: &str,
    workflow: &str,
    out: &mut W,
) -> GsnipResult<String> {
    let parent = workflow_name(project, location, workflow);
    let mut execution = ExecutionsClient::create_execution(client, &parent, None).await?;
    writeln!(out, "Created execution: {}", execution.name)?;

    let mut backoff = Backoff::doubling();
    while execution.is_active() {
        let delay = backoff.next_delay();
        info!("- Waiting {} seconds for results", delay.as_secs());
        tokio::time::sleep(delay).await;
        execution = ExecutionsClient::get_execution(client, &execution.name).await?;
    }

    writeln!(out, "Execution finished with state: {}", execution.state())?;
    if execution.state() != "SUCCEEDED" {
        return Err(execution_failure(&execution).into());
    }
    let result = execution.result.unwrap_or_default();
    writeln!(out, "Execution results: {}", result)?;
    Ok(result)
}
