//! In-memory node records
//!
//! Patches are applied with the same merge and JSON patch semantics the API
//! server uses, every write bumps `resourceVersion`, and each patch is kept in
//! a log so callers can inspect exactly what was sent.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::NodeApi;
use crate::errors::CoordinationError;

#[derive(Debug, Clone, PartialEq)]
pub enum NodePatch {
    Merge(Value),
    Json(Value),
}

#[derive(Debug, Default)]
pub struct InMemoryNodeApi {
    nodes: Mutex<HashMap<String, Node>>,
    patches: Mutex<Vec<(String, NodePatch)>>,
    unreachable: AtomicBool,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryNodeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a single schedulable or cordoned node
    pub fn with_node(name: &str, unschedulable: bool) -> Self {
        let api = Self::new();
        api.insert(Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                unschedulable: Some(unschedulable),
                ..Default::default()
            }),
            ..Default::default()
        });
        api
    }

    pub fn insert(&self, mut node: Node) {
        let name = node.metadata.name.clone().unwrap_or_default();
        if node.metadata.resource_version.is_none() {
            node.metadata.resource_version = Some("1".to_string());
        }
        guard(&self.nodes).insert(name, node);
    }

    pub fn node(&self, name: &str) -> Option<Node> {
        guard(&self.nodes).get(name).cloned()
    }

    pub fn patches(&self) -> Vec<(String, NodePatch)> {
        guard(&self.patches).clone()
    }

    /// Make every subsequent call fail as if the API server were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self, operation: &str) -> Result<(), CoordinationError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CoordinationError::unreachable(operation, "connection refused"));
        }
        Ok(())
    }

    fn apply<F>(&self, name: &str, patch: NodePatch, apply: F) -> Result<(), CoordinationError>
    where
        F: FnOnce(&mut Value) -> Result<(), String>,
    {
        let operation = format!("patch node {}", name);
        self.check_reachable(&operation)?;

        let mut nodes = guard(&self.nodes);
        let node = nodes
            .get_mut(name)
            .ok_or_else(|| CoordinationError::unreachable(&operation, "node not found"))?;

        let mut doc = serde_json::to_value(&*node)
            .map_err(|e| CoordinationError::unreachable(&operation, e))?;
        apply(&mut doc).map_err(|e| CoordinationError::unreachable(&operation, e))?;

        let version = doc["metadata"]["resourceVersion"]
            .as_str()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        doc["metadata"]["resourceVersion"] = Value::String((version + 1).to_string());

        *node = serde_json::from_value(doc).map_err(|e| CoordinationError::unreachable(&operation, e))?;
        guard(&self.patches).push((name.to_string(), patch));
        Ok(())
    }
}

#[async_trait]
impl NodeApi for InMemoryNodeApi {
    async fn get(&self, name: &str) -> Result<Node, CoordinationError> {
        let operation = format!("get node {}", name);
        self.check_reachable(&operation)?;
        self.node(name)
            .ok_or_else(|| CoordinationError::unreachable(operation, "node not found"))
    }

    async fn patch_merge(&self, name: &str, patch: &Value) -> Result<(), CoordinationError> {
        self.apply(name, NodePatch::Merge(patch.clone()), |doc| {
            json_patch::merge(doc, patch);
            Ok(())
        })
    }

    async fn patch_json(&self, name: &str, patch: &Value) -> Result<(), CoordinationError> {
        self.apply(name, NodePatch::Json(patch.clone()), |doc| {
            let operations: json_patch::Patch =
                serde_json::from_value(patch.clone()).map_err(|e| e.to_string())?;
            json_patch::patch(doc, &operations.0).map_err(|e| e.to_string())
        })
    }
}
