//! Layered daemon configuration
//!
//! Built-in defaults, then the optional TOML file named by `--config`, then
//! flags given on the command line (or `KUSTODIAN_NODE_ID` for the node).
//! The result is validated once before anything talks to the cluster.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::cli::Cli;
use crate::constants::{annotations, defaults, paths};
use crate::drain::DrainOptions;
use crate::errors::ConfigError;
use crate::window::TimeWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub node_id: String,
    pub period_seconds: u64,
    pub ds_namespace: String,
    pub ds_name: String,
    pub maintenance_sentinel: PathBuf,
    pub in_progress_sentinel: PathBuf,
    /// Empty disables the taint
    pub prefer_no_schedule_taint: String,
    pub lock_annotation: String,
    /// 0 never expires
    pub lock_ttl_seconds: u64,
    /// Empty means every day
    pub maintenance_days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    pub time_zone: String,
    pub annotate_nodes: bool,
    pub metrics_address: String,
    pub log_level: String,
    pub drain_grace_period_seconds: Option<u32>,
    /// 0 waits indefinitely
    pub drain_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            period_seconds: defaults::PERIOD_SECONDS,
            ds_namespace: defaults::DS_NAMESPACE.to_string(),
            ds_name: defaults::DS_NAME.to_string(),
            maintenance_sentinel: PathBuf::from(paths::MAINTENANCE_REQUIRED),
            in_progress_sentinel: PathBuf::from(paths::MAINTENANCE_IN_PROGRESS),
            prefer_no_schedule_taint: String::new(),
            lock_annotation: annotations::NODE_LOCK.to_string(),
            lock_ttl_seconds: defaults::LOCK_TTL_SECONDS,
            maintenance_days: Vec::new(),
            start_time: defaults::START_TIME.to_string(),
            end_time: defaults::END_TIME.to_string(),
            time_zone: defaults::TIME_ZONE.to_string(),
            annotate_nodes: false,
            metrics_address: defaults::METRICS_ADDRESS.to_string(),
            log_level: defaults::LOG_LEVEL.to_string(),
            drain_grace_period_seconds: None,
            drain_timeout_seconds: defaults::DRAIN_TIMEOUT_SECONDS,
        }
    }
}

impl Config {
    pub async fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        config.apply(cli);
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            reason: format!("{}: {}", path.display(), e),
        })
    }

    /// Overlays the flags that were given explicitly
    pub fn apply(&mut self, cli: &Cli) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut self.node_id, &cli.node_id);
        set(&mut self.period_seconds, &cli.period_seconds);
        set(&mut self.ds_namespace, &cli.ds_namespace);
        set(&mut self.ds_name, &cli.ds_name);
        set(&mut self.maintenance_sentinel, &cli.maintenance_sentinel);
        set(&mut self.in_progress_sentinel, &cli.in_progress_sentinel);
        set(&mut self.prefer_no_schedule_taint, &cli.prefer_no_schedule_taint);
        set(&mut self.lock_annotation, &cli.lock_annotation);
        set(&mut self.lock_ttl_seconds, &cli.lock_ttl_seconds);
        set(&mut self.maintenance_days, &cli.maintenance_days);
        set(&mut self.start_time, &cli.start_time);
        set(&mut self.end_time, &cli.end_time);
        set(&mut self.time_zone, &cli.time_zone);
        set(&mut self.metrics_address, &cli.metrics_address);
        set(&mut self.log_level, &cli.log_level);
        set(&mut self.drain_timeout_seconds, &cli.drain_timeout_seconds);
        if cli.drain_grace_period_seconds.is_some() {
            self.drain_grace_period_seconds = cli.drain_grace_period_seconds;
        }
        if cli.annotate_nodes {
            self.annotate_nodes = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "node_id".to_string(),
            });
        }
        if self.period_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "period_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.ds_name.is_empty() || self.ds_namespace.is_empty() || self.lock_annotation.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ds_name".to_string(),
                reason: "lock location must name a namespace, a DaemonSet and an annotation".to_string(),
            });
        }
        self.metrics_socket()?;
        self.time_window()?;
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_seconds)
    }

    pub fn taint(&self) -> Option<&str> {
        Some(self.prefer_no_schedule_taint.trim()).filter(|taint| !taint.is_empty())
    }

    pub fn time_window(&self) -> Result<TimeWindow, ConfigError> {
        TimeWindow::new(
            &self.maintenance_days,
            &self.start_time,
            &self.end_time,
            &self.time_zone,
        )
    }

    pub fn metrics_socket(&self) -> Result<SocketAddr, ConfigError> {
        self.metrics_address
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                field: "metrics_address".to_string(),
                reason: format!("'{}': {}", self.metrics_address, e),
            })
    }

    pub fn drain_options(&self) -> DrainOptions {
        DrainOptions {
            grace_period_seconds: self.drain_grace_period_seconds,
            timeout: Some(Duration::from_secs(self.drain_timeout_seconds))
                .filter(|timeout| !timeout.is_zero()),
        }
    }

    pub fn log_effective(&self, window: &TimeWindow) {
        info!("Node ID: {}", self.node_id);
        info!(
            "Lock annotation: {}/{}:{}",
            self.ds_namespace, self.ds_name, self.lock_annotation
        );
        if self.lock_ttl_seconds > 0 {
            info!("Lock TTL set, lock will expire after: {}s", self.lock_ttl_seconds);
        } else {
            info!("Lock TTL not set, lock will remain until being released");
        }
        match self.taint() {
            Some(taint) => info!("Taint {} applied while waiting for the lock", taint),
            None => info!("No PreferNoSchedule taint configured"),
        }
        info!(
            "Maintenance sentinel: {}, checking every {}s",
            self.maintenance_sentinel.display(),
            self.period_seconds
        );
        info!("Maintenance window: {}", window);
        info!("Node annotations: {}", if self.annotate_nodes { "enabled" } else { "disabled" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["kustodian"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn defaults_with_node_id() {
        std::env::remove_var(crate::constants::env::NODE_ID);
        let config = Config::load(&cli(&["--node-id", "worker-1"])).await.unwrap();

        assert_eq!(config.node_id, "worker-1");
        assert_eq!(config.period(), Duration::from_secs(3600));
        assert_eq!(config.ds_namespace, "kube-system");
        assert_eq!(config.ds_name, "kustodian");
        assert_eq!(config.lock_annotation, "k8s.io/kustodian-node-lock");
        assert_eq!(config.lock_ttl(), Duration::ZERO);
        assert_eq!(config.taint(), None);
        assert_eq!(config.drain_options(), DrainOptions::default());
        assert!(!config.annotate_nodes);
    }

    #[tokio::test]
    #[serial]
    async fn missing_node_id_is_rejected() {
        std::env::remove_var(crate::constants::env::NODE_ID);
        let err = Config::load(&cli(&[])).await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { field } if field == "node_id"));
    }

    #[tokio::test]
    #[serial]
    async fn flags_override_file() {
        std::env::remove_var(crate::constants::env::NODE_ID);
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
node_id = "from-file"
period_seconds = 600
prefer_no_schedule_taint = "kustodian-waiting"
maintenance_days = ["sat", "sun"]
start_time = "02:00"
end_time = "05:00"
drain_timeout_seconds = 900
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = Config::load(&cli(&["--config", path, "--period-seconds", "120"]))
            .await
            .unwrap();

        assert_eq!(config.node_id, "from-file");
        assert_eq!(config.period_seconds, 120);
        assert_eq!(config.taint(), Some("kustodian-waiting"));
        assert_eq!(config.maintenance_days, vec!["sat", "sun"]);
        assert_eq!(config.drain_options().timeout, Some(Duration::from_secs(900)));
        assert_eq!(
            config.time_window().unwrap().to_string(),
            "Sun,Sat between 02:00:00 and 05:00:00 UTC"
        );
    }

    #[tokio::test]
    async fn unknown_file_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "reboot_command = \"/sbin/reboot\"").unwrap();

        assert!(matches!(
            Config::from_file(file.path()).await,
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_fails_to_load() {
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/kustodian.toml")).await,
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn zero_period_is_invalid() {
        let config = Config {
            node_id: "worker-1".to_string(),
            period_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "period_seconds"
        ));
    }

    #[test]
    fn bad_metrics_address_is_invalid() {
        let config = Config {
            node_id: "worker-1".to_string(),
            metrics_address: "localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "metrics_address"
        ));
    }

    #[test]
    fn bad_window_is_invalid() {
        let config = Config {
            node_id: "worker-1".to_string(),
            time_zone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
