//! # gsnip-tasks – Cloud Tasks samples
//!
//! - [`pull`]: create, lease and acknowledge tasks on a pull queue through
//!   any [`TaskQueue`](queue::TaskQueue).
//! - [`handler`]: HTTP endpoint an App Engine push queue delivers tasks to.

pub mod error;
pub mod handler;
pub mod pull;
pub mod queue;

pub use error::{TasksError, TasksResult};
pub use queue::{CloudTasksQueue, TaskQueue};
