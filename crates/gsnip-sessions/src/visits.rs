//! Visit counter on Memorystore for Redis.
//!
//! The connection pool is built on first use and shared by every request:
//! at most `max_connections` connections are checked out at once and
//! returned connections are kept for reuse.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{debug, error, info, warn};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::{Arc, Mutex};
use tokio::sync::{OnceCell, Semaphore, SemaphorePermit};

pub const VISITS_KEY: &str = "visits";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

impl RedisSettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

// ── Pool ────────────────────────────────────────────────────────────────

pub struct RedisPool {
    client: redis::Client,
    permits: Semaphore,
    idle: Mutex<Vec<MultiplexedConnection>>,
}

/// A checked-out connection, returned to the pool on drop unless it was
/// discarded.
pub struct PooledConnection<'a> {
    conn: Option<MultiplexedConnection>,
    pool: &'a RedisPool,
    _permit: SemaphorePermit<'a>,
}

impl PooledConnection<'_> {
    pub fn connection(&mut self) -> Option<&mut MultiplexedConnection> {
        self.conn.as_mut()
    }

    /// Close the connection instead of returning it; the next checkout
    /// dials a fresh one. Multiplexed connections never reconnect, so one
    /// that failed a command stays broken.
    pub fn discard(mut self) {
        self.conn.take();
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let (Some(conn), Ok(mut idle)) = (self.conn.take(), self.pool.idle.lock()) {
            idle.push(conn);
        }
    }
}

impl RedisPool {
    pub fn new(settings: &RedisSettings) -> SessionResult<Self> {
        Ok(Self {
            client: redis::Client::open(settings.url())?,
            permits: Semaphore::new(settings.max_connections.max(1)),
            idle: Mutex::new(Vec::new()),
        })
    }

    pub async fn acquire(&self) -> SessionResult<PooledConnection<'_>> {
        let permit = self.permits.acquire().await.map_err(|_| SessionError::PoolClosed)?;
        let reused = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let conn = match reused {
            Some(conn) => conn,
            None => {
                debug!("dialing a new redis connection");
                self.client.get_multiplexed_async_connection().await?
            }
        };
        debug!("redis connection checked out, {} more available", self.available());
        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

// ── Counter ─────────────────────────────────────────────────────────────

#[async_trait]
pub trait VisitCounter: Send + Sync {
    /// Increment the counter and return the new value.
    async fn incr(&self) -> SessionResult<i64>;
}

/// Pool created once, on the first request that needs it.
pub struct LazyRedisCounter {
    settings: RedisSettings,
    pool: OnceCell<RedisPool>,
}

impl LazyRedisCounter {
    pub fn new(settings: RedisSettings) -> Self {
        Self {
            settings,
            pool: OnceCell::new(),
        }
    }

    async fn pool(&self) -> SessionResult<&RedisPool> {
        self.pool
            .get_or_try_init(|| async {
                info!("connecting to redis at {}", self.settings.url());
                RedisPool::new(&self.settings)
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }
}

#[async_trait]
impl VisitCounter for LazyRedisCounter {
    async fn incr(&self) -> SessionResult<i64> {
        let pool = self.pool().await?;
        let mut pooled = pool.acquire().await?;
        let conn = pooled.connection().ok_or(SessionError::PoolClosed)?;
        let result: redis::RedisResult<i64> = conn.incr(VISITS_KEY, 1).await;
        match result {
            Ok(count) => Ok(count),
            Err(e) => {
                warn!("dropping redis connection after error: {}", e);
                pooled.discard();
                Err(e.into())
            }
        }
    }
}

/// Process-local counter for tests and local runs without Redis.
#[derive(Default)]
pub struct MemoryCounter {
    count: std::sync::atomic::AtomicI64,
}

#[async_trait]
impl VisitCounter for MemoryCounter {
    async fn incr(&self) -> SessionResult<i64> {
        Ok(self.count.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1)
    }
}

// ── Handler ─────────────────────────────────────────────────────────────

pub fn router(counter: Arc<dyn VisitCounter>) -> Router {
    Router::new().route("/", get(index)).with_state(counter)
}

async fn index(State(counter): State<Arc<dyn VisitCounter>>) -> Response {
    match counter.incr().await {
        Ok(count) => format!("Visit count: {}", count).into_response(),
        Err(e) => {
            error!("could not increment visit count: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error incrementing visit count").into_response()
        }
    }
}
