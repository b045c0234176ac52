//! Where a pool lives between invocations.

use crate::error::LeaseResult;
use crate::pool::{Pool, PoolKind};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A pool mutation. It may run more than once if the store retries the
/// transaction, each time against freshly loaded state.
pub type PoolMutation<'a> = dyn FnMut(&mut Pool) -> LeaseResult<()> + Send + 'a;

/// Transactional access to a stored pool.
#[async_trait]
pub trait PoolStore: Send + Sync {
    fn kind(&self) -> PoolKind;

    /// Load the whole pool, apply `f`, and write the pool back, all in one
    /// transaction. When `f` fails nothing is written and its error is
    /// returned.
    async fn with_pool(&self, f: &mut PoolMutation<'_>) -> LeaseResult<()>;
}

// ── In-memory store ─────────────────────────────────────────────────────

/// Process-local pool, for tests and dry runs.
#[derive(Debug)]
pub struct MemoryPoolStore {
    kind: PoolKind,
    pool: Mutex<Pool>,
}

impl MemoryPoolStore {
    pub fn new(kind: PoolKind) -> Self {
        Self {
            kind,
            pool: Mutex::new(Pool::new(kind)),
        }
    }

    pub async fn snapshot(&self) -> Pool {
        self.pool.lock().await.clone()
    }
}

#[async_trait]
impl PoolStore for MemoryPoolStore {
    fn kind(&self) -> PoolKind {
        self.kind
    }

    async fn with_pool(&self, f: &mut PoolMutation<'_>) -> LeaseResult<()> {
        let mut guard = self.pool.lock().await;
        let mut working = guard.clone();
        f(&mut working)?;
        *guard = working;
        Ok(())
    }
}
