//! Access to this daemon's node record
//!
//! The daemon never owns the node object. It reads a fresh copy when it
//! needs one and changes it only through narrowly scoped patches, so that
//! unrelated writers touching other fields are not clobbered.

pub mod kubernetes;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use kubernetes::KubeNodeApi;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{InMemoryNodeApi, NodePatch};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use serde_json::Value;

use crate::errors::CoordinationError;

#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn get(&self, name: &str) -> Result<Node, CoordinationError>;

    /// Apply an RFC 7386 merge patch
    async fn patch_merge(&self, name: &str, patch: &Value) -> Result<(), CoordinationError>;

    /// Apply an RFC 6902 JSON patch given as its JSON array form
    async fn patch_json(&self, name: &str, patch: &Value) -> Result<(), CoordinationError>;
}

pub fn is_unschedulable(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|spec| spec.unschedulable)
        .unwrap_or(false)
}

pub fn has_annotation(node: &Node, key: &str) -> bool {
    node.metadata
        .annotations
        .as_ref()
        .is_some_and(|annotations| annotations.contains_key(key))
}

pub fn node_name(node: &Node) -> &str {
    node.metadata.name.as_deref().unwrap_or_default()
}
