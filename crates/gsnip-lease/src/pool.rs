//! The leasing pool itself, independent of where it is stored.
//!
//! A resource is available when its `lease_expiry` is at or before `now`.
//! Every operation takes `now` explicitly so callers (and tests) decide the
//! clock.

use crate::error::{LeaseError, LeaseResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// How far into the past `done` pushes a lease.
const DONE_BACKDATE_SECS: i64 = 10;

// ── Pool kinds ──────────────────────────────────────────────────────────

/// The two pools share one engine and differ only in naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Projects,
    ServiceAccounts,
}

impl PoolKind {
    pub fn binary(self) -> &'static str {
        match self {
            Self::Projects => "gimmeproj",
            Self::ServiceAccounts => "gimme-acc",
        }
    }

    /// Datastore entity name under kind `Pool`.
    pub fn entity_name(self) -> &'static str {
        match self {
            Self::Projects => "pool",
            Self::ServiceAccounts => "acc-pool",
        }
    }

    /// Pool entity property holding the resource list.
    pub fn property(self) -> &'static str {
        match self {
            Self::Projects => "Projects",
            Self::ServiceAccounts => "ServiceAccounts",
        }
    }

    /// Property of each resource holding its identifier.
    pub fn id_field(self) -> &'static str {
        match self {
            Self::Projects => "ID",
            Self::ServiceAccounts => "Email",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            Self::Projects => "project",
            Self::ServiceAccounts => "service account",
        }
    }

    /// What the user has to pass to `done`, `pool-add` and `pool-rm`.
    pub fn id_noun(self) -> &'static str {
        match self {
            Self::Projects => "project id",
            Self::ServiceAccounts => "service account email",
        }
    }

    pub fn status_column(self) -> &'static str {
        match self {
            Self::Projects => "PROJECT",
            Self::ServiceAccounts => "SERVICE ACCOUNT",
        }
    }

    fn not_found_scope(self) -> &'static str {
        match self {
            Self::Projects => "project pool",
            Self::ServiceAccounts => "pool",
        }
    }
}

// ── Resources ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub lease_expiry: DateTime<Utc>,
}

impl Resource {
    /// A resource that has never been leased.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lease_expiry: DateTime::<Utc>::default(),
        }
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.lease_expiry <= now
    }

    /// Remaining lease, truncated to whole seconds. `None` once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_available(now) {
            return None;
        }
        let secs = (self.lease_expiry - now).num_seconds();
        Some(Duration::from_secs(secs.max(0) as u64))
    }
}

/// One line of `status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: String,
    pub remaining: Option<Duration>,
}

// ── Pool ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    kind: PoolKind,
    resources: Vec<Resource>,
}

impl Pool {
    pub fn new(kind: PoolKind) -> Self {
        Self {
            kind,
            resources: Vec::new(),
        }
    }

    pub fn with_resources(kind: PoolKind, resources: Vec<Resource>) -> Self {
        Self { kind, resources }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.id == id)
    }

    /// Insert `id` as immediately available.
    pub fn add(&mut self, id: &str) -> LeaseResult<()> {
        if self.get(id).is_some() {
            return Err(LeaseError::AlreadyExists(id.to_string()));
        }
        self.resources.push(Resource::new(id));
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> LeaseResult<()> {
        if self.get(id).is_none() {
            return Err(LeaseError::NotInPool(id.to_string()));
        }
        self.resources.retain(|r| r.id != id);
        Ok(())
    }

    /// Lease the resource whose lease expired longest ago.
    ///
    /// Ties go to the first resource in pool order. If even the oldest lease
    /// is still running the pool is exhausted.
    pub fn lease(&mut self, duration: Duration, now: DateTime<Utc>) -> LeaseResult<Resource> {
        let noun = self.kind.noun();
        let resource = self
            .resources
            .iter_mut()
            .min_by_key(|r| r.lease_expiry)
            .ok_or(LeaseError::Exhausted(noun))?;
        if !resource.is_available(now) {
            return Err(LeaseError::Exhausted(noun));
        }
        let duration = ChronoDuration::from_std(duration)
            .map_err(|e| LeaseError::Usage(format!("lease duration out of range: {}", e)))?;
        resource.lease_expiry = now + duration;
        Ok(resource.clone())
    }

    /// Return `id` to the pool by expiring its lease slightly in the past.
    pub fn done(&mut self, id: &str, now: DateTime<Utc>) -> LeaseResult<()> {
        let kind = self.kind;
        let resource = self.get_mut(id).ok_or_else(|| LeaseError::NotFound {
            noun: kind.noun(),
            pool: kind.not_found_scope(),
            id: id.to_string(),
        })?;
        resource.lease_expiry = now - ChronoDuration::seconds(DONE_BACKDATE_SECS);
        Ok(())
    }

    pub fn status(&self, now: DateTime<Utc>) -> Vec<StatusEntry> {
        self.resources
            .iter()
            .map(|r| StatusEntry {
                id: r.id.clone(),
                remaining: r.remaining(now),
            })
            .collect()
    }
}
