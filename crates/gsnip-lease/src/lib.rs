//! # gsnip-lease – leasing pool for test resources
//!
//! Hands out GCP projects (`gimmeproj`) or service accounts (`gimme-acc`)
//! from a shared pool so concurrent test runs never share one.
//!
//! ```text
//!   add ──► Available ──lease(d)──► Leased ──done / expiry──► Available
//! ```
//!
//! The pool is one document; every command loads it, mutates it in memory
//! and writes it back inside a single transaction ([`store::PoolStore`]).

pub mod cli;
pub mod datastore;
pub mod error;
pub mod pool;
pub mod store;

pub use error::{LeaseError, LeaseResult};
pub use pool::{Pool, PoolKind, Resource};
pub use store::{MemoryPoolStore, PoolStore};
