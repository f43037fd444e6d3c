//! Versioned storage for the lock value
//!
//! Every write is conditioned on the version observed by the preceding read.
//! A store that cannot do this natively must reject the write when the
//! version moved, which the lock protocol reports as contention.

use async_trait::async_trait;

use crate::errors::CoordinationError;

/// Lock value together with the version token it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The stored version no longer matches the expected one
    Conflict,
}

#[async_trait]
pub trait LockStore: Send + Sync {
    async fn read(&self) -> Result<VersionedValue, CoordinationError>;

    /// Replace the value (`None` clears it) if the stored version is still
    /// `expected_version`.
    async fn write(
        &self,
        value: Option<String>,
        expected_version: &str,
    ) -> Result<WriteOutcome, CoordinationError>;
}
