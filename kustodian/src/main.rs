use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use kustodian::cli::Cli;
use kustodian::config::Config;
use kustodian::drain::KubeDrainer;
use kustodian::host::HostFiles;
use kustodian::lock::{DaemonSetLockStore, MaintenanceLock};
use kustodian::metrics::MaintenanceMetrics;
use kustodian::node::KubeNodeApi;
use kustodian::orchestrator::{Orchestrator, OrchestratorSettings};
use kustodian::taint::TaintController;
use kustodian::ticker::DelayTick;
use kustodian::web::MetricsServer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli).await?;
    kustodian::logging::init(&config.log_level)?;

    info!("Starting kustodian {}", env!("CARGO_PKG_VERSION"));
    let window = config.time_window()?;
    config.log_effective(&window);

    let metrics = MaintenanceMetrics::new().context("Failed to register metrics")?;
    let server = MetricsServer::start(&config.metrics_address, metrics.clone()).await?;

    let client = kube::Client::try_default()
        .await
        .context("Failed to build cluster client")?;

    let nodes = Arc::new(KubeNodeApi::new(client.clone()));
    let store = Arc::new(DaemonSetLockStore::new(
        client.clone(),
        &config.ds_namespace,
        &config.ds_name,
        &config.lock_annotation,
    ));
    let mut orchestrator = Orchestrator::new(
        OrchestratorSettings {
            node_id: config.node_id.clone(),
            annotate_nodes: config.annotate_nodes,
            lock_ttl: config.lock_ttl(),
        },
        window,
        MaintenanceLock::new(store, config.node_id.clone()),
        nodes.clone(),
        Arc::new(KubeDrainer::new(client, config.drain_options())),
        Arc::new(HostFiles::new(
            config.maintenance_sentinel.clone(),
            config.in_progress_sentinel.clone(),
        )),
        metrics,
    );
    if let Some(taint) = config.taint() {
        orchestrator = orchestrator.with_taint(TaintController::prefer_no_schedule(
            nodes,
            &config.node_id,
            taint,
        ));
    }

    let mut ticker = DelayTick::new(config.period(), &mut rand::thread_rng());

    let outcome = tokio::select! {
        result = orchestrator.run(&mut ticker) => result,
        signal = shutdown_signal() => {
            signal?;
            info!("Shutdown signal received");
            Ok(())
        }
    };

    if let Err(e) = server.shutdown().await {
        error!("Metrics server did not stop cleanly: {}", e);
    }

    outcome.map_err(|e| {
        error!("Exiting: {}", e);
        e.into()
    })
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
