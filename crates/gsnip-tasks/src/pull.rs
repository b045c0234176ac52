//! Pull-queue round trip: create a task, lease it, acknowledge it.

use crate::error::{TasksError, TasksResult};
use crate::queue::TaskQueue;
use gsnip_gcp::tasks::{queue_name, PullMessage, Task};
use log::info;
use std::io::Write;

/// Payload of every task created by [`task_create`].
pub const MESSAGE: &str = "a message for the recipient";

/// Lease granted by [`task_lease`], in seconds.
pub const LEASE_SECONDS: u64 = 600;

/// Create a pull task carrying [`MESSAGE`] and print its name.
pub async fn task_create<W: Write + Send>(
    tasks: &dyn TaskQueue,
    project: &str,
    location: &str,
    queue: &str,
    out: &mut W,
) -> TasksResult<Task> {
    let parent = queue_name(project, location, queue);
    let task = Task {
        pull_message: Some(PullMessage::new(MESSAGE.as_bytes())),
        ..Default::default()
    };
    let created = tasks
        .create_task(&parent, task)
        .await
        .map_err(TasksError::api("CreateCloudTask"))?;
    writeln!(out, "Created task: {}", created.name)?;
    Ok(created)
}

/// Lease at most one task for [`LEASE_SECONDS`]. `None` when the queue is
/// empty.
pub async fn task_lease<W: Write + Send>(
    tasks: &dyn TaskQueue,
    project: &str,
    location: &str,
    queue: &str,
    out: &mut W,
) -> TasksResult<Option<Task>> {
    let parent = queue_name(project, location, queue);
    let leased = tasks
        .lease_tasks(&parent, 1, LEASE_SECONDS)
        .await
        .map_err(TasksError::api("LeaseCloudTask"))?;
    let Some(task) = leased.into_iter().next() else {
        return Ok(None);
    };
    writeln!(out, "Leased task: {}", task.name)?;
    Ok(Some(task))
}

/// Acknowledge a leased task. The schedule time must be the one returned by
/// the lease.
pub async fn task_ack<W: Write + Send>(
    tasks: &dyn TaskQueue,
    task: &Task,
    out: &mut W,
) -> TasksResult<()> {
    tasks
        .acknowledge_task(&task.name, task.schedule_time.clone())
        .await
        .map_err(TasksError::api("AcknowledgeCloudTask"))?;
    writeln!(out, "Acknowledged task: {}", task.name)?;
    Ok(())
}

/// Lease one task and acknowledge it. An empty queue is not an error.
pub async fn lease_and_ack<W: Write + Send>(
    tasks: &dyn TaskQueue,
    project: &str,
    location: &str,
    queue: &str,
    out: &mut W,
) -> TasksResult<Option<Task>> {
    match task_lease(tasks, project, location, queue, out).await? {
        None => {
            info!("No tasks available for lease");
            Ok(None)
        }
        Some(task) => {
            task_ack(tasks, &task, out).await?;
            Ok(Some(task))
        }
    }
}
