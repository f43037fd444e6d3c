//! Canonical names, paths and defaults shared across the daemon
//!
//! Constants are grouped by concern so the orchestrator, the platform
//! bindings and the configuration layer agree on a single value.

use std::time::Duration;

/// Node annotation keys
pub mod annotations {
    /// Annotation on the lock DaemonSet recording the current holder
    pub const NODE_LOCK: &str = "k8s.io/kustodian-node-lock";

    /// Set on a node while its maintenance is in progress
    pub const MAINTENANCE_IN_PROGRESS: &str = "k8s.io/maintenance-in-progress";

    /// Timestamp of the most recent time this node needed maintenance
    pub const MOST_RECENT_MAINTENANCE_NEEDED: &str = "k8s.io/most-recent-maintenance-needed";

    /// Set by the kubelet on static (mirror) pods
    pub const MIRROR_POD: &str = "kubernetes.io/config.mirror";
}

/// Host filesystem markers
pub mod paths {
    /// Existence of this file signals that maintenance is required
    pub const MAINTENANCE_REQUIRED: &str = "/var/maintenance-required";

    /// Created while this node is cordoned and drained for maintenance
    pub const MAINTENANCE_IN_PROGRESS: &str = "/var/maintenance-in-progress";
}

/// Prometheus metric names
pub mod metrics {
    pub const NODE_IN_MAINTENANCE_WINDOW: &str = "kustodian_node_in_maintenance_window";
    pub const NODE_PERFORMING_MAINTENANCE: &str = "kustodian_node_performing_maintenance";
    pub const NODE_COMPLETED_MAINTENANCE: &str = "kustodian_node_completed_maintenance";

    /// HTTP path the metrics are served on
    pub const PATH: &str = "/metrics";
}

/// Taint applied while contending for the lock
pub mod taints {
    pub const PREFER_NO_SCHEDULE: &str = "PreferNoSchedule";
}

/// Environment variables
pub mod env {
    /// Identity of the node this daemon runs on
    pub const NODE_ID: &str = "KUSTODIAN_NODE_ID";
}

/// Default configuration values
pub mod defaults {
    /// Maintenance check period in seconds
    pub const PERIOD_SECONDS: u64 = 3600;

    pub const DS_NAMESPACE: &str = "kube-system";
    pub const DS_NAME: &str = "kustodian";

    /// 0 disables lock expiry
    pub const LOCK_TTL_SECONDS: u64 = 0;

    pub const START_TIME: &str = "0:00";
    pub const END_TIME: &str = "23:59:59";
    pub const TIME_ZONE: &str = "UTC";

    pub const METRICS_ADDRESS: &str = "0.0.0.0:9090";
    pub const LOG_LEVEL: &str = "info";

    /// 0 waits for a drain indefinitely
    pub const DRAIN_TIMEOUT_SECONDS: u64 = 0;
}

/// Lock protocol limits
pub mod lock {
    /// Attempts at clearing the lock before a version conflict becomes fatal
    pub const MAX_RELEASE_ATTEMPTS: u32 = 3;
}

/// Drain tuning
pub mod drain {
    use super::Duration;

    /// Wait between eviction attempts refused by a disruption budget
    pub const EVICTION_RETRY_INTERVAL: Duration = Duration::from_secs(5);

    /// Interval between checks that evicted pods are gone
    pub const POD_DELETION_POLL_INTERVAL: Duration = Duration::from_secs(2);
}
