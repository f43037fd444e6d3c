use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::Value;

use super::NodeApi;
use crate::errors::CoordinationError;

pub struct KubeNodeApi {
    api: Api<Node>,
}

impl KubeNodeApi {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl NodeApi for KubeNodeApi {
    async fn get(&self, name: &str) -> Result<Node, CoordinationError> {
        self.api
            .get(name)
            .await
            .map_err(|e| CoordinationError::unreachable(format!("get node {}", name), e))
    }

    async fn patch_merge(&self, name: &str, patch: &Value) -> Result<(), CoordinationError> {
        self.api
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| CoordinationError::unreachable(format!("patch node {}", name), e))
    }

    async fn patch_json(&self, name: &str, patch: &Value) -> Result<(), CoordinationError> {
        let operations: json_patch::Patch = serde_json::from_value(patch.clone())
            .map_err(|e| CoordinationError::unreachable(format!("encode patch for node {}", name), e))?;

        self.api
            .patch(name, &PatchParams::default(), &Patch::Json::<()>(operations))
            .await
            .map(|_| ())
            .map_err(|e| CoordinationError::unreachable(format!("patch node {}", name), e))
    }
}
