use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceState {
    Idle,
    /// No sentinel and no lock held
    AwaitingSentinel,
    /// Lock found held by this node at startup, not yet re-validated
    HoldingNotDraining,
    AwaitingWindow,
    ContendingForLock,
    Draining,
    InMaintenance,
    Releasing,
}

impl fmt::Display for MaintenanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaintenanceState::Idle => "idle",
            MaintenanceState::AwaitingSentinel => "awaiting-sentinel",
            MaintenanceState::HoldingNotDraining => "holding-not-draining",
            MaintenanceState::AwaitingWindow => "awaiting-window",
            MaintenanceState::ContendingForLock => "contending-for-lock",
            MaintenanceState::Draining => "draining",
            MaintenanceState::InMaintenance => "in-maintenance",
            MaintenanceState::Releasing => "releasing",
        };
        f.write_str(name)
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    OutsideWindow,
    NotRequired,
    /// Maintenance finished: node restored and lock released
    Completed,
    /// Lock already held by this node and the sentinel is still present
    StillInMaintenance,
    Contended { holder: String },
    Drained,
}

/// Stored as the lock metadata so release can restore schedulability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(rename = "unschedulable")]
    pub previously_unschedulable: bool,
}
