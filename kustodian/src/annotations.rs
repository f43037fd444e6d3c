//! Bookkeeping annotations on the node record
//!
//! Additions go out as a merge patch touching only the given keys. Removal
//! is a single-operation JSON patch whose path is a JSON pointer, so the key
//! must be escaped: annotation keys are namespaced and routinely contain `/`.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::errors::CoordinationError;
use crate::node::NodeApi;

pub struct NodeAnnotations {
    api: Arc<dyn NodeApi>,
}

impl NodeAnnotations {
    pub fn new(api: Arc<dyn NodeApi>) -> Self {
        Self { api }
    }

    pub async fn add(
        &self,
        node_id: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), CoordinationError> {
        for (key, value) in annotations {
            info!(node = %node_id, "Adding node annotation {}={}", key, value);
        }
        self.api.patch_merge(node_id, &addition_patch(annotations)).await
    }

    pub async fn remove(&self, node_id: &str, key: &str) -> Result<(), CoordinationError> {
        info!(node = %node_id, "Deleting node annotation {}", key);
        self.api.patch_json(node_id, &removal_patch(key)).await
    }
}

pub fn addition_patch(annotations: &BTreeMap<String, String>) -> Value {
    let annotations: Map<String, Value> = annotations
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    json!({ "metadata": { "annotations": annotations } })
}

/// `[{"op":"remove","path":"/metadata/annotations/<escaped-key>"}]`
pub fn removal_patch(key: &str) -> Value {
    json!([{
        "op": "remove",
        "path": format!("/metadata/annotations/{}", escape_pointer_token(key)),
    }])
}

/// RFC 6901 reference token escaping: `~` becomes `~0`, then `/` becomes `~1`
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{has_annotation, InMemoryNodeApi, NodePatch};

    #[test]
    fn removal_path_escapes_slashes() {
        let patch = removal_patch("k8s.io/maintenance-in-progress");
        assert_eq!(
            patch,
            json!([{ "op": "remove", "path": "/metadata/annotations/k8s.io~1maintenance-in-progress" }])
        );
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"[{"op":"remove","path":"/metadata/annotations/k8s.io~1maintenance-in-progress"}]"#
        );
    }

    #[test]
    fn every_slash_is_escaped() {
        assert_eq!(escape_pointer_token("a/b/c"), "a~1b~1c");
        assert_eq!(escape_pointer_token("plain"), "plain");
    }

    #[tokio::test]
    async fn add_then_remove_round_trip_on_node() {
        let api = Arc::new(InMemoryNodeApi::with_node("worker-1", false));
        let bookkeeper = NodeAnnotations::new(api.clone());

        let mut annotations = BTreeMap::new();
        annotations.insert("k8s.io/maintenance-in-progress".to_string(), "now".to_string());
        annotations.insert("k8s.io/most-recent-maintenance-needed".to_string(), "now".to_string());
        bookkeeper.add("worker-1", &annotations).await.unwrap();

        let node = api.node("worker-1").unwrap();
        assert!(has_annotation(&node, "k8s.io/maintenance-in-progress"));
        assert!(has_annotation(&node, "k8s.io/most-recent-maintenance-needed"));
        assert_eq!(api.patches().len(), 1, "both keys go out in one patch");

        bookkeeper
            .remove("worker-1", "k8s.io/maintenance-in-progress")
            .await
            .unwrap();
        let node = api.node("worker-1").unwrap();
        assert!(!has_annotation(&node, "k8s.io/maintenance-in-progress"));
        assert!(has_annotation(&node, "k8s.io/most-recent-maintenance-needed"));
        assert!(matches!(api.patches().last(), Some((_, NodePatch::Json(_)))));
    }

    #[tokio::test]
    async fn failures_are_reported() {
        let api = Arc::new(InMemoryNodeApi::with_node("worker-1", false));
        api.set_unreachable(true);
        let bookkeeper = NodeAnnotations::new(api.clone());

        assert!(bookkeeper.remove("worker-1", "k8s.io/x").await.is_err());
    }
}
