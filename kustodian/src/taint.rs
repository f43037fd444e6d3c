//! PreferNoSchedule taint on this node
//!
//! Applied while the node waits for the maintenance lock so the scheduler
//! steers new pods elsewhere and the same workload is not drained twice in
//! successive rounds. Both directions are idempotent. Patches include a test
//! on `resourceVersion` so a concurrent change to the taint list fails the
//! patch instead of removing the wrong entry.

use k8s_openapi::api::core::v1::{Node, Taint};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::taints::PREFER_NO_SCHEDULE;
use crate::errors::CoordinationError;
use crate::node::NodeApi;

pub struct TaintController {
    api: Arc<dyn NodeApi>,
    node_id: String,
    key: String,
    effect: String,
}

impl TaintController {
    pub fn prefer_no_schedule(api: Arc<dyn NodeApi>, node_id: &str, key: &str) -> Self {
        Self {
            api,
            node_id: node_id.to_string(),
            key: key.to_string(),
            effect: PREFER_NO_SCHEDULE.to_string(),
        }
    }

    pub async fn enable(&self) -> Result<(), CoordinationError> {
        let node = self.api.get(&self.node_id).await?;
        if self.position(&node).is_some() {
            debug!(taint = %self.key, "Taint already present");
            return Ok(());
        }

        let taint = serde_json::to_value(Taint {
            key: self.key.clone(),
            effect: self.effect.clone(),
            ..Default::default()
        })
        .map_err(|e| CoordinationError::unreachable("encode taint", e))?;

        let has_taints = node
            .spec
            .as_ref()
            .and_then(|spec| spec.taints.as_ref())
            .is_some();
        let add = if has_taints {
            json!({ "op": "add", "path": "/spec/taints/-", "value": taint })
        } else {
            json!({ "op": "add", "path": "/spec/taints", "value": [taint] })
        };

        info!(node = %self.node_id, taint = %self.key, effect = %self.effect, "Adding taint");
        self.api
            .patch_json(&self.node_id, &Value::Array(vec![version_test(&node), add]))
            .await
    }

    pub async fn disable(&self) -> Result<(), CoordinationError> {
        let node = self.api.get(&self.node_id).await?;
        let Some(index) = self.position(&node) else {
            debug!(taint = %self.key, "Taint already absent");
            return Ok(());
        };

        let remove = json!({ "op": "remove", "path": format!("/spec/taints/{}", index) });

        info!(node = %self.node_id, taint = %self.key, effect = %self.effect, "Removing taint");
        self.api
            .patch_json(&self.node_id, &Value::Array(vec![version_test(&node), remove]))
            .await
    }

    pub async fn is_enabled(&self) -> Result<bool, CoordinationError> {
        let node = self.api.get(&self.node_id).await?;
        Ok(self.position(&node).is_some())
    }

    fn position(&self, node: &Node) -> Option<usize> {
        node.spec
            .as_ref()
            .and_then(|spec| spec.taints.as_ref())
            .and_then(|taints| {
                taints
                    .iter()
                    .position(|t| t.key == self.key && t.effect == self.effect)
            })
    }
}

fn version_test(node: &Node) -> Value {
    json!({
        "op": "test",
        "path": "/metadata/resourceVersion",
        "value": node.metadata.resource_version.clone().unwrap_or_default(),
    })
}
