use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Chatty dependencies kept at warn unless `RUST_LOG` says otherwise
const QUIET_TARGETS: [&str; 3] = ["kube=warn", "hyper=warn", "tower_http=warn"];

/// Installs the global subscriber. `RUST_LOG`, when set, replaces `level`.
pub fn init(level: &str) -> Result<()> {
    let filter = build_filter(level, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())?;
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))
}

pub fn build_filter(level: &str, from_env: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = from_env.filter(|d| !d.trim().is_empty()) {
        return Ok(EnvFilter::try_new(directives)?);
    }

    let mut filter = EnvFilter::try_new(level)?;
    for target in QUIET_TARGETS {
        filter = filter.add_directive(target.parse()?);
    }
    Ok(filter)
}
