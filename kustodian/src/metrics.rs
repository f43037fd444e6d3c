//! Maintenance metrics
//!
//! Held in a registry owned by [`MaintenanceMetrics`] rather than the
//! process-wide default, so each daemon context (and each test) gets its own.
//! Cloning shares the underlying collectors.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::constants::metrics::{
    NODE_COMPLETED_MAINTENANCE, NODE_IN_MAINTENANCE_WINDOW, NODE_PERFORMING_MAINTENANCE,
};

#[derive(Clone)]
pub struct MaintenanceMetrics {
    registry: Registry,
    in_window: IntGauge,
    in_progress: IntGauge,
    completed: IntCounter,
}

impl MaintenanceMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let in_window = IntGauge::new(
            NODE_IN_MAINTENANCE_WINDOW,
            "Whether the node is in the maintenance window",
        )?;
        let in_progress = IntGauge::new(
            NODE_PERFORMING_MAINTENANCE,
            "Whether the node is performing maintenance",
        )?;
        let completed = IntCounter::new(NODE_COMPLETED_MAINTENANCE, "Node completed maintenance")?;

        registry.register(Box::new(in_window.clone()))?;
        registry.register(Box::new(in_progress.clone()))?;
        registry.register(Box::new(completed.clone()))?;

        Ok(Self {
            registry,
            in_window,
            in_progress,
            completed,
        })
    }

    pub fn set_in_window(&self, inside: bool) {
        self.in_window.set(i64::from(inside));
    }

    pub fn maintenance_started(&self) {
        self.in_progress.inc();
    }

    /// Marks maintenance resumed after a restart without counting a new start
    pub fn maintenance_resumed(&self) {
        self.in_progress.set(1);
    }

    pub fn maintenance_completed(&self) {
        if self.in_progress.get() > 0 {
            self.in_progress.dec();
        }
        self.completed.inc();
    }

    pub fn in_window(&self) -> i64 {
        self.in_window.get()
    }

    pub fn in_progress(&self) -> i64 {
        self.in_progress.get()
    }

    pub fn completed(&self) -> u64 {
        self.completed.get()
    }

    /// Text exposition format
    pub fn render(&self) -> Result<(String, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        let body = String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))?;
        Ok((encoder.format_type().to_string(), body))
    }
}
