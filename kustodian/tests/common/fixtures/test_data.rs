//! Common test data and constants

use chrono::{DateTime, Utc};

/// Common test node names
pub mod nodes {
    pub const NODE_1: &str = "worker-1";
    pub const NODE_2: &str = "worker-2";
    pub const NODE_3: &str = "worker-3";
}

pub const TAINT: &str = "kustodian.io/waiting-for-maintenance";

/// Instants relative to a Monday 10:00-12:00 UTC window
pub mod instants {
    use super::*;

    pub fn monday_11() -> DateTime<Utc> {
        "2024-01-01T11:00:00Z".parse().unwrap()
    }

    pub fn monday_13() -> DateTime<Utc> {
        "2024-01-01T13:00:00Z".parse().unwrap()
    }

    pub fn tuesday_11() -> DateTime<Utc> {
        "2024-01-02T11:00:00Z".parse().unwrap()
    }
}
