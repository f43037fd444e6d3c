//! Drainer that records calls and flips `spec.unschedulable` on the
//! in-memory node record, so schedulability can be asserted afterwards.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kustodian::drain::Drainer;
use kustodian::errors::DrainError;
use kustodian::node::{node_name, InMemoryNodeApi, NodeApi};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainEvent {
    Drained(String),
    Uncordoned(String),
}

pub struct RecordingDrainer {
    api: Arc<InMemoryNodeApi>,
    events: Mutex<Vec<DrainEvent>>,
}

impl RecordingDrainer {
    pub fn new(api: Arc<InMemoryNodeApi>) -> Self {
        Self {
            api,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<DrainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn drain_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, DrainEvent::Drained(_)))
            .count()
    }

    async fn set_unschedulable(&self, name: &str, unschedulable: bool) {
        self.api
            .patch_merge(name, &json!({ "spec": { "unschedulable": unschedulable } }))
            .await
            .unwrap();
    }
}

#[async_trait]
impl Drainer for RecordingDrainer {
    async fn cordon_and_drain(&self, node: &Node) -> Result<(), DrainError> {
        let name = node_name(node).to_string();
        self.set_unschedulable(&name, true).await;
        self.events.lock().unwrap().push(DrainEvent::Drained(name));
        Ok(())
    }

    async fn uncordon(&self, node: &Node) -> Result<(), DrainError> {
        let name = node_name(node).to_string();
        self.set_unschedulable(&name, false).await;
        self.events.lock().unwrap().push(DrainEvent::Uncordoned(name));
        Ok(())
    }
}
