//! Command-line flags
//!
//! Every flag is optional so that only values given explicitly override the
//! configuration file; see [`crate::config::Config::load`].

use clap::Parser;
use std::path::PathBuf;

use crate::constants::env::NODE_ID;

#[derive(Debug, Default, Clone, Parser)]
#[command(
    name = "kustodian",
    version,
    about = "Coordinates node maintenance so only one node of a cluster is drained at a time"
)]
pub struct Cli {
    /// Name of the node this daemon runs on
    #[arg(long, env = NODE_ID)]
    pub node_id: Option<String>,

    /// Optional TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maintenance check period
    #[arg(long)]
    pub period_seconds: Option<u64>,

    /// Namespace of the DaemonSet holding the lock
    #[arg(long)]
    pub ds_namespace: Option<String>,

    /// Name of the DaemonSet holding the lock
    #[arg(long)]
    pub ds_name: Option<String>,

    /// File whose existence signals that maintenance is required
    #[arg(long)]
    pub maintenance_sentinel: Option<PathBuf>,

    /// File created while maintenance is in progress
    #[arg(long)]
    pub in_progress_sentinel: Option<PathBuf>,

    /// PreferNoSchedule taint applied while waiting for the lock; empty disables
    #[arg(long)]
    pub prefer_no_schedule_taint: Option<String>,

    /// Annotation on the DaemonSet that stores the lock
    #[arg(long)]
    pub lock_annotation: Option<String>,

    /// Age after which a lock held by another node may be taken over; 0 never expires
    #[arg(long)]
    pub lock_ttl_seconds: Option<u64>,

    /// Days maintenance may start, e.g. mon,wed,fri
    #[arg(long, value_delimiter = ',')]
    pub maintenance_days: Option<Vec<String>>,

    /// Start of the daily window
    #[arg(long)]
    pub start_time: Option<String>,

    /// End of the daily window
    #[arg(long)]
    pub end_time: Option<String>,

    /// Timezone the window is expressed in
    #[arg(long)]
    pub time_zone: Option<String>,

    /// Record maintenance progress in node annotations
    #[arg(long)]
    pub annotate_nodes: bool,

    /// Listen address for /metrics
    #[arg(long)]
    pub metrics_address: Option<String>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long)]
    pub log_level: Option<String>,

    /// Grace period given to evicted pods instead of their own
    #[arg(long)]
    pub drain_grace_period_seconds: Option<u32>,

    /// Give up draining after this long; 0 waits indefinitely
    #[arg(long)]
    pub drain_timeout_seconds: Option<u64>,
}
