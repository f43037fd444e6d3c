//! HTTP surface: Prometheus metrics only

pub mod server;

pub use server::{create_router, MetricsServer};
