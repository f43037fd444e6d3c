//! Cordon, drain and uncordon
//!
//! The orchestrator only decides when a node may go offline; the mechanics of
//! taking it offline sit behind [`Drainer`].

pub mod kubernetes;

pub use kubernetes::KubeDrainer;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use std::time::Duration;

use crate::errors::DrainError;

#[async_trait]
pub trait Drainer: Send + Sync {
    /// Mark the node unschedulable and evict its workloads
    async fn cordon_and_drain(&self, node: &Node) -> Result<(), DrainError>;

    /// Make the node schedulable again
    async fn uncordon(&self, node: &Node) -> Result<(), DrainError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainOptions {
    /// Overrides each pod's own termination grace period
    pub grace_period_seconds: Option<u32>,
    /// Upper bound on the whole drain; `None` waits indefinitely
    pub timeout: Option<Duration>,
}
