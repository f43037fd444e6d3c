//! Signals exchanged with the host through marker files
//!
//! The maintenance sentinel is written by whatever decides this node needs
//! work; the daemon only checks for it. The in-progress marker is ours: it
//! exists from the moment the node is drained until the lock is released.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::errors::{MarkerError, SentinelCheckError};

#[async_trait]
pub trait HostSignals: Send + Sync {
    async fn maintenance_required(&self) -> Result<bool, SentinelCheckError>;

    async fn mark_in_progress(&self) -> Result<(), MarkerError>;

    async fn clear_in_progress(&self) -> Result<(), MarkerError>;
}

#[derive(Debug, Clone)]
pub struct HostFiles {
    sentinel: PathBuf,
    in_progress: PathBuf,
}

impl HostFiles {
    pub fn new(sentinel: impl Into<PathBuf>, in_progress: impl Into<PathBuf>) -> Self {
        Self {
            sentinel: sentinel.into(),
            in_progress: in_progress.into(),
        }
    }

    pub fn sentinel(&self) -> &Path {
        &self.sentinel
    }

    pub fn in_progress(&self) -> &Path {
        &self.in_progress
    }
}

#[async_trait]
impl HostSignals for HostFiles {
    async fn maintenance_required(&self) -> Result<bool, SentinelCheckError> {
        let required = match fs::metadata(&self.sentinel).await {
            Ok(metadata) => metadata.is_file(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(SentinelCheckError {
                    path: self.sentinel.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        if required {
            info!("Maintenance required");
        } else {
            info!("Maintenance not required");
        }
        Ok(required)
    }

    async fn mark_in_progress(&self) -> Result<(), MarkerError> {
        info!(
            "Marking node for maintenance by creating {}",
            self.in_progress.display()
        );
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.in_progress)
            .await
            .map(|_| ())
            .map_err(|e| MarkerError::CreateFailed {
                path: self.in_progress.display().to_string(),
                reason: e.to_string(),
            })
    }

    async fn clear_in_progress(&self) -> Result<(), MarkerError> {
        info!(
            "Node maintenance is over, removing {}",
            self.in_progress.display()
        );
        match fs::remove_file(&self.in_progress).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MarkerError::RemoveFailed {
                path: self.in_progress.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
