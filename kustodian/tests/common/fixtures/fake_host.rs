//! Host signals held in memory

use async_trait::async_trait;
use kustodian::errors::{MarkerError, SentinelCheckError};
use kustodian::host::HostSignals;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct FakeHost {
    required: AtomicBool,
    in_progress: AtomicBool,
    broken_sentinel: AtomicBool,
}

impl FakeHost {
    pub fn set_required(&self, required: bool) {
        self.required.store(required, Ordering::SeqCst);
    }

    pub fn in_progress_marked(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Make the sentinel check fail, e.g. on a permission error
    pub fn break_sentinel(&self) {
        self.broken_sentinel.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl HostSignals for FakeHost {
    async fn maintenance_required(&self) -> Result<bool, SentinelCheckError> {
        if self.broken_sentinel.load(Ordering::SeqCst) {
            return Err(SentinelCheckError {
                path: "/var/maintenance-required".to_string(),
                reason: "permission denied".to_string(),
            });
        }
        Ok(self.required.load(Ordering::SeqCst))
    }

    async fn mark_in_progress(&self) -> Result<(), MarkerError> {
        self.in_progress.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn clear_in_progress(&self) -> Result<(), MarkerError> {
        self.in_progress.store(false, Ordering::SeqCst);
        Ok(())
    }
}
