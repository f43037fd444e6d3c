//! Per-node maintenance control loop
//!
//! Each tick reads the sentinel, consults the window, contends for the
//! cluster-wide lock and, once it holds the lock, drains the node. When the
//! sentinel disappears the node is restored and the lock released. Only
//! contention is an expected failure; every other error is returned to the
//! caller, which terminates the process.

pub mod state;

pub use state::{MaintenanceState, NodeMeta, TickOutcome};

use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::annotations::NodeAnnotations;
use crate::constants::annotations::{MAINTENANCE_IN_PROGRESS, MOST_RECENT_MAINTENANCE_NEEDED};
use crate::drain::Drainer;
use crate::errors::KustodianError;
use crate::host::HostSignals;
use crate::lock::MaintenanceLock;
use crate::metrics::MaintenanceMetrics;
use crate::node::{has_annotation, is_unschedulable, NodeApi};
use crate::taint::TaintController;
use crate::ticker::DelayTick;
use crate::window::TimeWindow;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub node_id: String,
    pub annotate_nodes: bool,
    /// Zero never expires
    pub lock_ttl: Duration,
}

pub struct Orchestrator {
    settings: OrchestratorSettings,
    window: TimeWindow,
    lock: MaintenanceLock,
    nodes: Arc<dyn NodeApi>,
    annotations: NodeAnnotations,
    taint: Option<TaintController>,
    drainer: Arc<dyn Drainer>,
    host: Arc<dyn HostSignals>,
    metrics: MaintenanceMetrics,
    /// Set while the node is cordoned by this daemon, whether or not the
    /// lock is still held
    drained: Option<NodeMeta>,
    state: MaintenanceState,
}

impl Orchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        window: TimeWindow,
        lock: MaintenanceLock,
        nodes: Arc<dyn NodeApi>,
        drainer: Arc<dyn Drainer>,
        host: Arc<dyn HostSignals>,
        metrics: MaintenanceMetrics,
    ) -> Self {
        Self {
            annotations: NodeAnnotations::new(nodes.clone()),
            settings,
            window,
            lock,
            nodes,
            taint: None,
            drainer,
            host,
            metrics,
            drained: None,
            state: MaintenanceState::Idle,
        }
    }

    /// Apply a PreferNoSchedule taint while waiting for the lock
    pub fn with_taint(mut self, taint: TaintController) -> Self {
        self.taint = Some(taint);
        self
    }

    pub fn state(&self) -> MaintenanceState {
        self.state
    }

    /// Schedulability recorded when this daemon cordoned the node
    pub fn drained_meta(&self) -> Option<NodeMeta> {
        self.drained
    }

    /// Recovers from a previous run. A lock still held by this node is either
    /// resumed (sentinel present) or released straight away. A configured
    /// taint is cleared whenever maintenance is not required.
    pub async fn recover(&mut self) -> Result<(), KustodianError> {
        let required = self.host.maintenance_required().await?;

        if let Some(meta) = self.lock.test::<NodeMeta>().await? {
            self.drained = Some(meta);
            self.transition(MaintenanceState::HoldingNotDraining);

            let node = self.nodes.get(&self.settings.node_id).await?;
            if required {
                info!(node = %self.settings.node_id, "Holding lock from a previous run, maintenance still in progress");
                self.metrics.maintenance_resumed();
                self.transition(MaintenanceState::InMaintenance);
            } else {
                info!(node = %self.settings.node_id, "Holding lock from a previous run but maintenance is no longer required");
                self.finish_maintenance(&node).await?;
            }
        }

        if !required {
            if let Some(taint) = &self.taint {
                taint.disable().await?;
            }
        }
        Ok(())
    }

    pub async fn tick(&mut self) -> Result<TickOutcome, KustodianError> {
        self.tick_at(Utc::now()).await
    }

    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, KustodianError> {
        let in_window = self.window.contains(&now);
        self.metrics.set_in_window(in_window);

        if !in_window {
            debug!(window = %self.window, "Outside maintenance window");
            if let Some(taint) = &self.taint {
                taint.disable().await?;
            }
            if self.drained.is_none() {
                self.transition(MaintenanceState::AwaitingWindow);
            }
            return Ok(TickOutcome::OutsideWindow);
        }

        let node = self.nodes.get(&self.settings.node_id).await?;
        let held = self.lock.test::<NodeMeta>().await?;
        if held.is_some() {
            self.drained = held;
        }

        if !self.host.maintenance_required().await? {
            if let Some(taint) = &self.taint {
                taint.disable().await?;
            }
            if held.is_some() {
                self.finish_maintenance(&node).await?;
                return Ok(TickOutcome::Completed);
            }
            if self.drained.is_some() {
                // the lock was taken over after expiring; restore the node but leave the lock alone
                warn!(node = %self.settings.node_id, "Lock lost during maintenance, restoring node without releasing");
                self.transition(MaintenanceState::Releasing);
                self.restore_node(&node).await?;
                self.metrics.maintenance_completed();
                self.drained = None;
                self.transition(MaintenanceState::Idle);
                return Ok(TickOutcome::Completed);
            }
            self.transition(MaintenanceState::AwaitingSentinel);
            return Ok(TickOutcome::NotRequired);
        }

        if held.is_some() {
            debug!(node = %self.settings.node_id, "Lock held, maintenance in progress");
            self.transition(MaintenanceState::InMaintenance);
            return Ok(TickOutcome::StillInMaintenance);
        }

        // a node this daemon cordoned keeps the schedulability it had before
        let resuming = self.drained.is_some();
        let meta = self.drained.unwrap_or_else(|| NodeMeta {
            previously_unschedulable: is_unschedulable(&node),
        });

        if self.settings.annotate_nodes && !has_annotation(&node, MAINTENANCE_IN_PROGRESS) {
            let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
            let stamps = BTreeMap::from([
                (MAINTENANCE_IN_PROGRESS.to_string(), timestamp.clone()),
                (MOST_RECENT_MAINTENANCE_NEEDED.to_string(), timestamp),
            ]);
            self.annotations.add(&self.settings.node_id, &stamps).await?;
        }

        self.transition(MaintenanceState::ContendingForLock);
        match self.lock.acquire(&meta, self.settings.lock_ttl).await {
            Ok(()) => {}
            Err(KustodianError::Contention(contention)) => {
                warn!(
                    node = %self.settings.node_id,
                    holder = %contention.holder,
                    "Lock already held, retrying next tick"
                );
                if let Some(taint) = &self.taint {
                    taint.enable().await?;
                }
                return Ok(TickOutcome::Contended {
                    holder: contention.holder,
                });
            }
            Err(e) => return Err(e),
        }

        info!(node = %self.settings.node_id, "Acquired lock");
        self.transition(MaintenanceState::Draining);
        self.drainer.cordon_and_drain(&node).await?;
        self.drained = Some(meta);
        self.host.mark_in_progress().await?;
        if resuming {
            self.metrics.maintenance_resumed();
        } else {
            self.metrics.maintenance_started();
        }
        self.transition(MaintenanceState::InMaintenance);
        Ok(TickOutcome::Drained)
    }

    /// Recovers, then ticks until an unrecoverable error
    pub async fn run(&mut self, ticker: &mut DelayTick) -> Result<(), KustodianError> {
        self.recover().await?;
        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(outcome) => debug!(?outcome, state = %self.state, "Tick complete"),
                Err(e) if e.is_recoverable() => warn!("Tick deferred: {}", e),
                Err(e) => {
                    error!(node = %self.settings.node_id, state = %self.state, "Maintenance loop failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn finish_maintenance(&mut self, node: &Node) -> Result<(), KustodianError> {
        self.transition(MaintenanceState::Releasing);
        self.restore_node(node).await?;
        self.lock.release().await?;
        self.metrics.maintenance_completed();
        self.drained = None;
        info!(node = %self.settings.node_id, "Maintenance complete, lock released");

        self.transition(MaintenanceState::Idle);
        Ok(())
    }

    /// Undo what draining did to the node and the host
    async fn restore_node(&self, node: &Node) -> Result<(), KustodianError> {
        let meta = self.drained.unwrap_or_default();
        if meta.previously_unschedulable {
            info!(node = %self.settings.node_id, "Node was unschedulable before maintenance, leaving it cordoned");
        } else {
            self.drainer.uncordon(node).await?;
        }

        if self.settings.annotate_nodes && has_annotation(node, MAINTENANCE_IN_PROGRESS) {
            self.annotations
                .remove(&self.settings.node_id, MAINTENANCE_IN_PROGRESS)
                .await?;
        }

        self.host.clear_in_progress().await?;
        Ok(())
    }

    fn transition(&mut self, to: MaintenanceState) {
        if self.state != to {
            info!(node = %self.settings.node_id, from = %self.state, to = %to, "State transition");
            self.state = to;
        }
    }
}
