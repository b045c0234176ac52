//! Pool persisted as a single Cloud Datastore entity.
//!
//! The pool is entity kind `Pool` (name `pool` or `acc-pool`) holding one
//! array property of embedded entities, each with the resource id and its
//! `LeaseExpiry`.

use crate::error::LeaseResult;
use crate::pool::{Pool, PoolKind, Resource};
use crate::store::{PoolMutation, PoolStore};
use async_trait::async_trait;
use gsnip_gcp::datastore::{DatastoreClient, Entity, Key, Mutation, Value};
use gsnip_gcp::GcpClient;
use log::{debug, warn};
use std::sync::Arc;

const POOL_KIND: &str = "Pool";
const LEASE_EXPIRY: &str = "LeaseExpiry";

/// Commit attempts before a contended transaction is reported.
const MAX_ATTEMPTS: u32 = 3;

pub struct DatastorePoolStore {
    client: Arc<GcpClient>,
    project: String,
    kind: PoolKind,
}

impl DatastorePoolStore {
    pub fn new(client: Arc<GcpClient>, meta_project: impl Into<String>, kind: PoolKind) -> Self {
        Self {
            client,
            project: meta_project.into(),
            kind,
        }
    }

    fn key(&self) -> Key {
        Key::named(&self.project, POOL_KIND, self.kind.entity_name())
    }

    async fn rollback(&self, transaction: &str) {
        if let Err(e) = DatastoreClient::rollback(&self.client, &self.project, transaction).await {
            warn!("rollback of {} failed: {}", transaction, e);
        }
    }
}

#[async_trait]
impl PoolStore for DatastorePoolStore {
    fn kind(&self) -> PoolKind {
        self.kind
    }

    async fn with_pool(&self, f: &mut PoolMutation<'_>) -> LeaseResult<()> {
        let key = self.key();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let tx = DatastoreClient::begin_transaction(&self.client, &self.project).await?;

            let entity =
                match DatastoreClient::lookup(&self.client, &self.project, &key, Some(&tx)).await {
                    Ok(entity) => entity,
                    Err(e) => {
                        self.rollback(&tx).await;
                        return Err(e.into());
                    }
                };
            if entity.is_none() {
                debug!(
                    "{}/{} does not exist yet, starting empty",
                    POOL_KIND,
                    self.kind.entity_name()
                );
            }

            let mut pool = decode_pool(self.kind, entity.as_ref());
            if let Err(e) = f(&mut pool) {
                self.rollback(&tx).await;
                return Err(e);
            }

            let mutation = Mutation::upsert(encode_pool(key.clone(), &pool));
            match DatastoreClient::commit(&self.client, &self.project, &tx, vec![mutation]).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_aborted() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "pool transaction aborted (attempt {}/{}), retrying",
                        attempt, MAX_ATTEMPTS
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// ── Entity mapping ──────────────────────────────────────────────────────

/// Decode the pool entity. A missing entity, or one without the resource
/// property, is an empty pool. Entries without an id are skipped.
pub fn decode_pool(kind: PoolKind, entity: Option<&Entity>) -> Pool {
    let resources = entity
        .and_then(|e| e.property(kind.property()))
        .map(|v| v.as_array())
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_entity)
        .filter_map(|e| {
            let id = e.property(kind.id_field())?.as_str()?;
            let lease_expiry = e
                .property(LEASE_EXPIRY)
                .and_then(Value::as_timestamp)
                .unwrap_or_default();
            Some(Resource {
                id: id.to_string(),
                lease_expiry,
            })
        })
        .collect();
    Pool::with_resources(kind, resources)
}

pub fn encode_pool(key: Key, pool: &Pool) -> Entity {
    let kind = pool.kind();
    let values = pool
        .resources()
        .iter()
        .map(|r| {
            let mut e = Entity::default();
            e.properties.insert(kind.id_field().to_string(), Value::string(&r.id));
            e.properties.insert(LEASE_EXPIRY.to_string(), Value::timestamp(r.lease_expiry));
            Value::entity(e)
        })
        .collect();

    let mut entity = Entity {
        key: Some(key),
        ..Default::default()
    };
    entity.properties.insert(kind.property().to_string(), Value::array(values));
    entity
}
