//! A cluster shared by several daemons: node records plus the lock slot

use k8s_openapi::api::core::v1::Node;
use kustodian::lock::{InMemoryLockStore, LockValue, MaintenanceLock};
use kustodian::metrics::MaintenanceMetrics;
use kustodian::node::{has_annotation, is_unschedulable, InMemoryNodeApi};
use kustodian::orchestrator::{Orchestrator, OrchestratorSettings};
use kustodian::taint::TaintController;
use kustodian::window::TimeWindow;
use std::sync::Arc;
use std::time::Duration;

use super::fake_drainer::RecordingDrainer;
use super::fake_host::FakeHost;
use super::test_data::TAINT;

pub struct TestCluster {
    pub nodes: Arc<InMemoryNodeApi>,
    pub store: Arc<InMemoryLockStore>,
}

impl TestCluster {
    /// All nodes start schedulable
    pub fn new(names: &[&str]) -> Self {
        let nodes = Arc::new(InMemoryNodeApi::new());
        let cluster = Self {
            nodes,
            store: Arc::new(InMemoryLockStore::new()),
        };
        for name in names {
            cluster.add_node(name, false);
        }
        cluster
    }

    pub fn add_node(&self, name: &str, unschedulable: bool) {
        let single = InMemoryNodeApi::with_node(name, unschedulable);
        if let Some(node) = single.node(name) {
            self.nodes.insert(node);
        }
    }

    pub fn daemon(&self, node_id: &str) -> TestDaemonBuilder<'_> {
        TestDaemonBuilder {
            cluster: self,
            node_id: node_id.to_string(),
            taint: false,
            annotate: false,
            ttl: Duration::ZERO,
        }
    }

    pub fn node(&self, name: &str) -> Node {
        self.nodes.node(name).unwrap()
    }

    pub fn is_cordoned(&self, name: &str) -> bool {
        is_unschedulable(&self.node(name))
    }

    pub fn has_annotation(&self, name: &str, key: &str) -> bool {
        has_annotation(&self.node(name), key)
    }

    pub fn annotation(&self, name: &str, key: &str) -> Option<String> {
        self.node(name)
            .metadata
            .annotations
            .and_then(|annotations| annotations.get(key).cloned())
    }

    pub fn is_tainted(&self, name: &str) -> bool {
        self.node(name)
            .spec
            .and_then(|spec| spec.taints)
            .is_some_and(|taints| taints.iter().any(|taint| taint.key == TAINT))
    }

    pub fn lock_holder(&self) -> Option<String> {
        self.store
            .value()
            .map(|raw| serde_json::from_str::<LockValue>(&raw).unwrap().node_id)
    }

    pub fn lock_metadata(&self) -> Option<serde_json::Value> {
        self.store
            .value()
            .map(|raw| serde_json::from_str::<LockValue>(&raw).unwrap().metadata)
    }

    /// Plant a lock written `age` ago by `holder`
    pub fn plant_lock(&self, holder: &str, age: Duration, ttl: Duration) {
        let value = LockValue {
            node_id: holder.to_string(),
            metadata: serde_json::json!({ "unschedulable": false }),
            created: chrono::Utc::now() - chrono::Duration::from_std(age).unwrap(),
            ttl,
        };
        self.store.force(Some(serde_json::to_string(&value).unwrap()));
    }
}

pub struct TestDaemonBuilder<'a> {
    cluster: &'a TestCluster,
    node_id: String,
    taint: bool,
    annotate: bool,
    ttl: Duration,
}

impl TestDaemonBuilder<'_> {
    pub fn with_taint(mut self) -> Self {
        self.taint = true;
        self
    }

    pub fn annotating(mut self) -> Self {
        self.annotate = true;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Daemon with a Monday 10:00-12:00 UTC window
    pub fn build(self) -> TestDaemon {
        self.build_with_host(Arc::new(FakeHost::default()))
    }

    /// Daemon reusing the host of a previous run, as after a restart
    pub fn build_with_host(self, host: Arc<FakeHost>) -> TestDaemon {
        let drainer = Arc::new(RecordingDrainer::new(self.cluster.nodes.clone()));
        let metrics = MaintenanceMetrics::new().unwrap();

        let mut orchestrator = Orchestrator::new(
            OrchestratorSettings {
                node_id: self.node_id.clone(),
                annotate_nodes: self.annotate,
                lock_ttl: self.ttl,
            },
            TimeWindow::new(&["mon"], "10:00", "12:00", "UTC").unwrap(),
            MaintenanceLock::new(self.cluster.store.clone(), self.node_id.clone()),
            self.cluster.nodes.clone(),
            drainer.clone(),
            host.clone(),
            metrics.clone(),
        );
        if self.taint {
            orchestrator = orchestrator.with_taint(TaintController::prefer_no_schedule(
                self.cluster.nodes.clone(),
                &self.node_id,
                TAINT,
            ));
        }

        TestDaemon {
            orchestrator,
            drainer,
            host,
            metrics,
        }
    }
}

pub struct TestDaemon {
    pub orchestrator: Orchestrator,
    pub drainer: Arc<RecordingDrainer>,
    pub host: Arc<FakeHost>,
    pub metrics: MaintenanceMetrics,
}
