//! # gsnip-gcp – Google Cloud REST plumbing
//!
//! Every sample in the workspace talks to Google Cloud through this crate.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Service clients                                 │
//! │   CloudTasksClient · DatastoreClient             │
//! │   FirestoreClient · WorkflowsClient              │
//! │   ExecutionsClient                               │
//! ├──────────────────────────────────────────────────┤
//! │  GcpClient  (client.rs)                          │
//! │  ├── get / post / patch                          │
//! │  ├── wait_for_operation  (LRO polling)           │
//! │  └── Backoff  (1 s doubling, 16 s cap)           │
//! ├──────────────────────────────────────────────────┤
//! │  TokenManager  (auth.rs)                         │
//! │  └── JWT / metadata server / static token        │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! | Service              | Module      | API Base                                       |
//! |----------------------|-------------|------------------------------------------------|
//! | Cloud Tasks          | `tasks`     | `https://cloudtasks.googleapis.com/v2beta2`    |
//! | Cloud Datastore      | `datastore` | `https://datastore.googleapis.com/v1`          |
//! | Cloud Firestore      | `firestore` | `https://firestore.googleapis.com/v1`          |
//! | Workflows            | `workflows` | `https://workflows.googleapis.com/v1`          |
//! | Workflow Executions  | `workflows` | `https://workflowexecutions.googleapis.com/v1` |

// ── Sub-modules ─────────────────────────────────────────────────────────

pub mod error;
pub mod config;
pub mod auth;
pub mod client;

// Service clients
pub mod tasks;
pub mod datastore;
pub mod firestore;
pub mod workflows;

pub use client::{Backoff, GcpClient};
pub use config::{ClientConfig, CredentialsSource};
pub use error::{GcpError, GcpResult};
