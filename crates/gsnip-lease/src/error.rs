use gsnip_gcp::GcpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("Could not find a free {0}. Try again soon.")]
    Exhausted(&'static str),

    #[error("{0} already in pool")]
    AlreadyExists(String),

    #[error("{0} not in pool")]
    NotInPool(String),

    /// `done` on an unknown id.
    #[error("Could not find {noun} {id} in {pool}.")]
    NotFound {
        noun: &'static str,
        pool: &'static str,
        id: String,
    },

    #[error("{0}")]
    Usage(String),

    #[error("Could not parse duration: {0}")]
    Duration(#[from] humantime::DurationError),

    #[error("datastore: {0}")]
    Store(#[from] GcpError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type LeaseResult<T> = Result<T, LeaseError>;
