use async_trait::async_trait;
use futures::future::try_join_all;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DeleteParams, EvictParams, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{DrainOptions, Drainer};
use crate::constants::annotations::MIRROR_POD;
use crate::constants::drain::{EVICTION_RETRY_INTERVAL, POD_DELETION_POLL_INTERVAL};
use crate::errors::DrainError;
use crate::node::{is_unschedulable, node_name};

/// Drains through the eviction API, so pod disruption budgets are honoured.
/// DaemonSet pods and static mirror pods are left alone.
pub struct KubeDrainer {
    client: Client,
    options: DrainOptions,
}

impl KubeDrainer {
    pub fn new(client: Client, options: DrainOptions) -> Self {
        Self { client, options }
    }

    async fn set_unschedulable(&self, name: &str, unschedulable: bool) -> Result<(), kube::Error> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let patch = json!({ "spec": { "unschedulable": unschedulable } });
        nodes
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
    }

    async fn evict_all(&self, node: &str) -> Result<(), DrainError> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields(&format!("spec.nodeName={}", node));
        let list = pods
            .list(&params)
            .await
            .map_err(|e| DrainError::ListPodsFailed {
                node: node.to_string(),
                reason: e.to_string(),
            })?;

        let targets: Vec<Pod> = list.items.into_iter().filter(should_evict).collect();
        info!(node = %node, pods = targets.len(), "Evicting pods");

        try_join_all(targets.iter().map(|pod| self.evict(node, pod))).await?;
        Ok(())
    }

    async fn evict(&self, node: &str, pod: &Pod) -> Result<(), DrainError> {
        let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");
        let name = pod.metadata.name.as_deref().unwrap_or_default();
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let failed = |reason: String| DrainError::EvictionFailed {
            node: node.to_string(),
            pod: format!("{}/{}", namespace, name),
            reason,
        };

        let params = EvictParams {
            delete_options: Some(DeleteParams {
                grace_period_seconds: self.options.grace_period_seconds,
                ..Default::default()
            }),
            ..Default::default()
        };

        loop {
            match api.evict(name, &params).await {
                Ok(_) => break,
                Err(kube::Error::Api(response)) if response.code == 404 => return Ok(()),
                Err(kube::Error::Api(response)) if response.code == 429 => {
                    warn!(
                        pod = %name,
                        namespace = %namespace,
                        "Eviction refused by disruption budget, retrying: {}",
                        response.message
                    );
                    tokio::time::sleep(EVICTION_RETRY_INTERVAL).await;
                }
                Err(e) => return Err(failed(e.to_string())),
            }
        }

        // the pod is gone once it is absent or replaced by one with a new uid
        loop {
            match api.get_opt(name).await {
                Ok(Some(current)) if current.metadata.uid == pod.metadata.uid => {
                    tokio::time::sleep(POD_DELETION_POLL_INTERVAL).await;
                }
                Ok(_) => {
                    debug!(pod = %name, namespace = %namespace, "Pod evicted");
                    return Ok(());
                }
                Err(e) => return Err(failed(e.to_string())),
            }
        }
    }
}

pub fn should_evict(pod: &Pod) -> bool {
    let is_mirror = pod
        .metadata
        .annotations
        .as_ref()
        .is_some_and(|annotations| annotations.contains_key(MIRROR_POD));
    let owned_by_daemonset = pod
        .metadata
        .owner_references
        .as_ref()
        .is_some_and(|owners| {
            owners
                .iter()
                .any(|owner| owner.controller == Some(true) && owner.kind == "DaemonSet")
        });

    !is_mirror && !owned_by_daemonset
}

#[async_trait]
impl Drainer for KubeDrainer {
    async fn cordon_and_drain(&self, node: &Node) -> Result<(), DrainError> {
        let name = node_name(node);
        info!(node = %name, "Draining node");

        if is_unschedulable(node) {
            debug!(node = %name, "Node already cordoned");
        } else {
            self.set_unschedulable(name, true)
                .await
                .map_err(|e| DrainError::CordonFailed {
                    node: name.to_string(),
                    reason: e.to_string(),
                })?;
        }

        match self.options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.evict_all(name))
                .await
                .map_err(|_| DrainError::Timeout {
                    node: name.to_string(),
                    seconds: timeout.as_secs(),
                })?,
            None => self.evict_all(name).await,
        }
    }

    async fn uncordon(&self, node: &Node) -> Result<(), DrainError> {
        let name = node_name(node);
        info!(node = %name, "Uncordoning node");
        self.set_unschedulable(name, false)
            .await
            .map_err(|e| DrainError::UncordonFailed {
                node: name.to_string(),
                reason: e.to_string(),
            })
    }
}
