//! Cluster-wide maintenance lock
//!
//! One slot per daemon group, stored as a JSON value in a [`LockStore`].
//! Acquire is a single compare-and-set against the version read just before
//! it: if anything changed in between, the attempt reports contention and the
//! caller waits for its next tick. A non-zero TTL lets any node take over a
//! lock whose holder disappeared without releasing it.

pub mod daemonset;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod store;

pub use daemonset::DaemonSetLockStore;
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryLockStore;
pub use store::{LockStore, VersionedValue, WriteOutcome};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::lock::MAX_RELEASE_ATTEMPTS;
use crate::errors::{ContentionError, CoordinationError, KustodianError};

/// Serialized form of the lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockValue {
    #[serde(rename = "nodeID")]
    pub node_id: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created: DateTime<Utc>,
    #[serde(rename = "TTL", default, with = "ttl_nanos")]
    pub ttl: Duration,
}

impl LockValue {
    /// A zero TTL never expires
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now.signed_duration_since(self.created) > ttl,
            Err(_) => false,
        }
    }

    fn parse(raw: &str) -> Result<Self, CoordinationError> {
        serde_json::from_str(raw).map_err(|e| CoordinationError::MalformedLock {
            reason: e.to_string(),
        })
    }
}

/// TTL stored as integer nanoseconds
mod ttl_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_nanos(u64::deserialize(deserializer)?))
    }
}

pub struct MaintenanceLock {
    store: Arc<dyn LockStore>,
    node_id: String,
}

impl MaintenanceLock {
    pub fn new(store: Arc<dyn LockStore>, node_id: impl Into<String>) -> Self {
        Self {
            store,
            node_id: node_id.into(),
        }
    }

    /// Returns the stored metadata if this node holds an unexpired lock.
    /// Never writes.
    pub async fn test<M: DeserializeOwned>(&self) -> Result<Option<M>, KustodianError> {
        let current = self.store.read().await?;
        let Some(raw) = current.value else {
            return Ok(None);
        };

        let value = LockValue::parse(&raw)?;
        if value.node_id != self.node_id || value.is_expired(Utc::now()) {
            return Ok(None);
        }

        let metadata = serde_json::from_value(value.metadata).map_err(|e| {
            CoordinationError::MalformedLock {
                reason: format!("metadata: {}", e),
            }
        })?;
        debug!(node = %self.node_id, "Holding lock");
        Ok(Some(metadata))
    }

    /// Single compare-and-set attempt. Fails with
    /// [`KustodianError::Contention`] when another node holds an unexpired
    /// lock or the value changed between the read and the write.
    pub async fn acquire<M: Serialize>(&self, metadata: &M, ttl: Duration) -> Result<(), KustodianError> {
        let current = self.store.read().await?;
        let now = Utc::now();

        if let Some(raw) = current.value.as_deref() {
            let existing = LockValue::parse(raw)?;
            if existing.node_id != self.node_id && !existing.is_expired(now) {
                return Err(ContentionError {
                    holder: existing.node_id,
                }
                .into());
            }
            if existing.node_id != self.node_id {
                info!(
                    previous_holder = %existing.node_id,
                    created = %existing.created,
                    "Lock TTL expired, taking over"
                );
            }
        }

        let value = LockValue {
            node_id: self.node_id.clone(),
            metadata: serde_json::to_value(metadata).map_err(|e| CoordinationError::MalformedLock {
                reason: format!("metadata: {}", e),
            })?,
            created: now,
            ttl,
        };
        let serialized = serde_json::to_string(&value).map_err(|e| CoordinationError::MalformedLock {
            reason: e.to_string(),
        })?;

        match self.store.write(Some(serialized), &current.version).await? {
            WriteOutcome::Written => Ok(()),
            WriteOutcome::Conflict => {
                let holder = self.current_holder().await?.unwrap_or_default();
                Err(ContentionError { holder }.into())
            }
        }
    }

    /// Clears the lock if this node holds it. An empty lock, or one held by
    /// another node, is left untouched.
    pub async fn release(&self) -> Result<(), KustodianError> {
        for attempt in 1..=MAX_RELEASE_ATTEMPTS {
            let current = self.store.read().await?;
            let Some(raw) = current.value.as_deref() else {
                debug!("Lock already empty");
                return Ok(());
            };

            let existing = LockValue::parse(raw)?;
            if existing.node_id != self.node_id {
                warn!(
                    holder = %existing.node_id,
                    "Lock is held by another node, leaving it in place"
                );
                return Ok(());
            }

            match self.store.write(None, &current.version).await? {
                WriteOutcome::Written => return Ok(()),
                WriteOutcome::Conflict => {
                    warn!(attempt, "Lock changed while releasing, retrying");
                }
            }
        }

        Err(CoordinationError::ReleaseConflict {
            attempts: MAX_RELEASE_ATTEMPTS,
        }
        .into())
    }

    pub async fn current_holder(&self) -> Result<Option<String>, KustodianError> {
        let current = self.store.read().await?;
        match current.value.as_deref() {
            Some(raw) => Ok(Some(LockValue::parse(raw)?.node_id)),
            None => Ok(None),
        }
    }
}
