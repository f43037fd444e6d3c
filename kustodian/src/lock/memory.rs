//! Process-local lock store for tests
//!
//! Same compare-and-set semantics as the platform-backed store. Built only
//! for unit tests and with the `test-util` feature.

use async_trait::async_trait;
use std::sync::Mutex;

use super::store::{LockStore, VersionedValue, WriteOutcome};
use crate::errors::CoordinationError;

#[derive(Debug, Default)]
pub struct InMemoryLockStore {
    inner: Mutex<(Option<String>, u64)>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value unconditionally, as an unrelated writer would
    pub fn force(&self, value: Option<String>) {
        let mut inner = self.lock_inner();
        inner.0 = value;
        inner.1 += 1;
    }

    pub fn value(&self) -> Option<String> {
        self.lock_inner().0.clone()
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, (Option<String>, u64)> {
        // a poisoned guard still holds consistent data: writes are single assignments
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn read(&self) -> Result<VersionedValue, CoordinationError> {
        let inner = self.lock_inner();
        Ok(VersionedValue {
            value: inner.0.clone(),
            version: inner.1.to_string(),
        })
    }

    async fn write(
        &self,
        value: Option<String>,
        expected_version: &str,
    ) -> Result<WriteOutcome, CoordinationError> {
        let mut inner = self.lock_inner();
        if inner.1.to_string() != expected_version {
            return Ok(WriteOutcome::Conflict);
        }
        inner.0 = value;
        inner.1 += 1;
        Ok(WriteOutcome::Written)
    }
}
