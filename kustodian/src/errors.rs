//! Custom error types for the maintenance daemon
//!
//! Only lock contention is an expected outcome. Every other variant is fatal
//! and is carried up to the single handler in `main`, which logs the cause and
//! exits non-zero so the node's supervisor restarts the daemon.

use std::fmt;

/// Main error type for the daemon
#[derive(Debug)]
pub enum KustodianError {
    /// Invalid or missing configuration
    Config(ConfigError),

    /// Failure talking to the coordination platform (node record, lock, annotations)
    Coordination(CoordinationError),

    /// The maintenance lock is held by another node
    Contention(ContentionError),

    /// Cordon, drain or uncordon failed
    Drain(DrainError),

    /// The maintenance sentinel could not be checked
    SentinelCheck(SentinelCheckError),

    /// The in-progress marker could not be written or removed
    Marker(MarkerError),
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration file
    LoadFailed { path: String, reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },

    /// Missing required configuration
    MissingRequired { field: String },

    /// Configuration parsing error
    ParseError { reason: String },
}

/// Coordination platform error variants
#[derive(Debug)]
pub enum CoordinationError {
    /// The platform API could not be reached or rejected the request
    Unreachable { operation: String, reason: String },

    /// The stored lock value could not be interpreted
    MalformedLock { reason: String },

    /// The lock kept changing underneath a release
    ReleaseConflict { attempts: u32 },
}

/// Lock held by someone else
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentionError {
    pub holder: String,
}

/// Drain collaborator error variants
#[derive(Debug)]
pub enum DrainError {
    CordonFailed { node: String, reason: String },

    UncordonFailed { node: String, reason: String },

    ListPodsFailed { node: String, reason: String },

    EvictionFailed {
        node: String,
        pod: String,
        reason: String,
    },

    Timeout { node: String, seconds: u64 },
}

/// Sentinel existence could not be determined
#[derive(Debug)]
pub struct SentinelCheckError {
    pub path: String,
    pub reason: String,
}

/// In-progress marker error variants
#[derive(Debug)]
pub enum MarkerError {
    CreateFailed { path: String, reason: String },

    RemoveFailed { path: String, reason: String },
}

impl KustodianError {
    /// Whether the control loop may carry on to the next tick
    pub fn is_recoverable(&self) -> bool {
        matches!(self, KustodianError::Contention(_))
    }
}

impl CoordinationError {
    pub fn unreachable(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        CoordinationError::Unreachable {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for KustodianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KustodianError::Config(e) => write!(f, "Configuration error: {}", e),
            KustodianError::Coordination(e) => write!(f, "Coordination error: {}", e),
            KustodianError::Contention(e) => write!(f, "Contention: {}", e),
            KustodianError::Drain(e) => write!(f, "Drain error: {}", e),
            KustodianError::SentinelCheck(e) => write!(f, "Sentinel check error: {}", e),
            KustodianError::Marker(e) => write!(f, "Marker error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required field: {}", field)
            }
            ConfigError::ParseError { reason } => {
                write!(f, "Failed to parse config: {}", reason)
            }
        }
    }
}

impl fmt::Display for CoordinationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinationError::Unreachable { operation, reason } => {
                write!(f, "Failed to {}: {}", operation, reason)
            }
            CoordinationError::MalformedLock { reason } => {
                write!(f, "Malformed lock value: {}", reason)
            }
            CoordinationError::ReleaseConflict { attempts } => {
                write!(
                    f,
                    "Lock was modified concurrently on each of {} release attempts",
                    attempts
                )
            }
        }
    }
}

impl fmt::Display for ContentionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock already held by '{}'", self.holder)
    }
}

impl fmt::Display for DrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainError::CordonFailed { node, reason } => {
                write!(f, "Failed to cordon '{}': {}", node, reason)
            }
            DrainError::UncordonFailed { node, reason } => {
                write!(f, "Failed to uncordon '{}': {}", node, reason)
            }
            DrainError::ListPodsFailed { node, reason } => {
                write!(f, "Failed to list pods on '{}': {}", node, reason)
            }
            DrainError::EvictionFailed { node, pod, reason } => {
                write!(f, "Failed to evict '{}' from '{}': {}", pod, node, reason)
            }
            DrainError::Timeout { node, seconds } => {
                write!(f, "Draining '{}' did not finish within {}s", node, seconds)
            }
        }
    }
}

impl fmt::Display for SentinelCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot check '{}': {}", self.path, self.reason)
    }
}

impl fmt::Display for MarkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerError::CreateFailed { path, reason } => {
                write!(f, "Failed to create '{}': {}", path, reason)
            }
            MarkerError::RemoveFailed { path, reason } => {
                write!(f, "Failed to remove '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for KustodianError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for CoordinationError {}
impl std::error::Error for ContentionError {}
impl std::error::Error for DrainError {}
impl std::error::Error for SentinelCheckError {}
impl std::error::Error for MarkerError {}

impl From<ConfigError> for KustodianError {
    fn from(err: ConfigError) -> Self {
        KustodianError::Config(err)
    }
}

impl From<CoordinationError> for KustodianError {
    fn from(err: CoordinationError) -> Self {
        KustodianError::Coordination(err)
    }
}

impl From<ContentionError> for KustodianError {
    fn from(err: ContentionError) -> Self {
        KustodianError::Contention(err)
    }
}

impl From<DrainError> for KustodianError {
    fn from(err: DrainError) -> Self {
        KustodianError::Drain(err)
    }
}

impl From<SentinelCheckError> for KustodianError {
    fn from(err: SentinelCheckError) -> Self {
        KustodianError::SentinelCheck(err)
    }
}

impl From<MarkerError> for KustodianError {
    fn from(err: MarkerError) -> Self {
        KustodianError::Marker(err)
    }
}
