//! Reusable pieces for driving daemons against in-memory platform fakes:
//! - A recording drainer and fake host signals
//! - A shared cluster (node records plus the lock slot) and a daemon builder
//! - Common node names and instants

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_drainer;
pub mod fake_host;
pub mod test_cluster;
pub mod test_data;

pub use fake_drainer::{DrainEvent, RecordingDrainer};
pub use fake_host::FakeHost;
pub use test_cluster::{TestCluster, TestDaemon, TestDaemonBuilder};
pub use test_data::*;
