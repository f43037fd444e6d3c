//! Lock stored as an annotation on the daemon's own DaemonSet
//!
//! Writes are JSON merge patches that carry `metadata.resourceVersion`; the
//! API server refuses them with 409 when the object moved on since the read.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use tracing::debug;

use super::store::{LockStore, VersionedValue, WriteOutcome};
use crate::errors::CoordinationError;

pub struct DaemonSetLockStore {
    api: Api<DaemonSet>,
    namespace: String,
    name: String,
    annotation: String,
}

impl DaemonSetLockStore {
    pub fn new(client: Client, namespace: &str, name: &str, annotation: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            name: name.to_string(),
            annotation: annotation.to_string(),
        }
    }

    fn location(&self) -> String {
        format!("{}/{}:{}", self.namespace, self.name, self.annotation)
    }
}

#[async_trait]
impl LockStore for DaemonSetLockStore {
    async fn read(&self) -> Result<VersionedValue, CoordinationError> {
        let ds = self
            .api
            .get(&self.name)
            .await
            .map_err(|e| CoordinationError::unreachable(format!("read lock {}", self.location()), e))?;

        let version = ds
            .metadata
            .resource_version
            .clone()
            .ok_or_else(|| CoordinationError::MalformedLock {
                reason: format!("daemonset {}/{} has no resourceVersion", self.namespace, self.name),
            })?;
        let value = ds
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(&self.annotation))
            .cloned();

        Ok(VersionedValue { value, version })
    }

    async fn write(
        &self,
        value: Option<String>,
        expected_version: &str,
    ) -> Result<WriteOutcome, CoordinationError> {
        // a null annotation value removes the key under merge-patch semantics
        let patch = json!({
            "metadata": {
                "resourceVersion": expected_version,
                "annotations": { self.annotation.as_str(): value },
            }
        });

        match self
            .api
            .patch(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(kube::Error::Api(response)) if response.code == 409 => {
                debug!(lock = %self.location(), "Lock write rejected, version moved");
                Ok(WriteOutcome::Conflict)
            }
            Err(e) => Err(CoordinationError::unreachable(
                format!("write lock {}", self.location()),
                e,
            )),
        }
    }
}
