pub mod annotations;
pub mod cli;
pub mod config;
pub mod constants;
pub mod drain;
pub mod errors;
pub mod host;
pub mod lock;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod orchestrator;
pub mod taint;
pub mod ticker;
pub mod web;
pub mod window;

// Re-export commonly used types
pub use config::Config;
pub use errors::KustodianError;
pub use lock::MaintenanceLock;
pub use metrics::MaintenanceMetrics;
pub use orchestrator::{Orchestrator, OrchestratorSettings, TickOutcome};
pub use window::TimeWindow;
