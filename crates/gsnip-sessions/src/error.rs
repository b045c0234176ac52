use gsnip_gcp::GcpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("firestore: {0}")]
    Store(#[from] GcpError),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("connection pool closed")]
    PoolClosed,
}

pub type SessionResult<T> = Result<T, SessionError>;
