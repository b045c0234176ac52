//! # gsnip
//!
//! Google Cloud samples rebuilt as one workspace. The reusable pieces live
//! in member crates; this crate wires them into binaries.
//!
//! ```text
//!  gsnip ───────┬── tasks      ──▶ gsnip-tasks    ──┐
//!               ├── workflows  ──▶ (this crate)   ──┤
//!               ├── cdn        ──▶ gsnip-cdn        │
//!               ├── media-cdn  ──▶ gsnip-cdn        ├──▶ gsnip-gcp ──▶ Google REST APIs
//!               ├── sessions   ──▶ gsnip-sessions ──┤
//!               ├── visits     ──▶ gsnip-sessions ──┘ (and Redis)
//!               └── speech     ──▶ gsnip-speech   ──▶ gsnip-gcp (token) + Speech gRPC
//!  gimmeproj ─┐
//!  gimme-acc ─┴──────────────────▶ gsnip-lease    ──▶ gsnip-gcp (Datastore)
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod workflows;

pub use config::Settings;
pub use error::{GsnipError, GsnipResult};
