use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::constants::metrics::PATH;
use crate::metrics::MaintenanceMetrics;

/// Background listener for `/metrics`. Runs until [`MetricsServer::shutdown`].
pub struct MetricsServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl MetricsServer {
    pub async fn start(address: &str, metrics: MaintenanceMetrics) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(address).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let app = create_router(metrics);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        info!("Metrics server running on http://{}{}", local_addr, PATH);
        Ok(Self {
            local_addr,
            shutdown,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn shutdown(self) -> Result<()> {
        debug!("Requesting metrics server shutdown");
        let _ = self.shutdown.send(());
        self.handle.await??;
        debug!("Metrics server stopped");
        Ok(())
    }
}

pub fn create_router(metrics: MaintenanceMetrics) -> Router {
    Router::new()
        .route(PATH, get(serve_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

async fn serve_metrics(State(metrics): State<MaintenanceMetrics>) -> Response {
    match metrics.render() {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
