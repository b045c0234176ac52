//! The Cloud Tasks calls the pull-queue sample needs, behind a trait.

use async_trait::async_trait;
use gsnip_gcp::tasks::{CloudTasksClient, Task};
use gsnip_gcp::{GcpClient, GcpResult};
use std::sync::Arc;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Create `task` in the queue named `queue` (full resource name).
    async fn create_task(&self, queue: &str, task: Task) -> GcpResult<Task>;

    async fn lease_tasks(
        &self,
        queue: &str,
        max_tasks: u32,
        lease_seconds: u64,
    ) -> GcpResult<Vec<Task>>;

    async fn acknowledge_task(
        &self,
        task_name: &str,
        schedule_time: Option<String>,
    ) -> GcpResult<()>;
}

/// [`TaskQueue`] backed by the Cloud Tasks v2beta2 REST API.
#[derive(Debug, Clone)]
pub struct CloudTasksQueue {
    client: Arc<GcpClient>,
}

impl CloudTasksQueue {
    pub fn new(client: Arc<GcpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskQueue for CloudTasksQueue {
    async fn create_task(&self, queue: &str, task: Task) -> GcpResult<Task> {
        CloudTasksClient::create_task(&self.client, queue, &task).await
    }

    async fn lease_tasks(
        &self,
        queue: &str,
        max_tasks: u32,
        lease_seconds: u64,
    ) -> GcpResult<Vec<Task>> {
        CloudTasksClient::lease_tasks(&self.client, queue, max_tasks, lease_seconds).await
    }

    async fn acknowledge_task(
        &self,
        task_name: &str,
        schedule_time: Option<String>,
    ) -> GcpResult<()> {
        CloudTasksClient::acknowledge_task(&self.client, task_name, schedule_time.as_deref()).await
    }
}
