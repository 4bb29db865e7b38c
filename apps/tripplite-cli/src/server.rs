use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use hid_transport::HidHost;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tripplite::{Collector, DriverConfig, MetricsExporter, MetricsSource};

type Source = Arc<dyn MetricsSource>;

/// Serve `/metrics` until Ctrl-C.
pub fn serve<H>(host: H, config: DriverConfig, hostname: String, port: u16) -> Result<()>
where
    H: HidHost + Send + 'static,
    H::Device: Send,
{
    let collector = Collector::new(host, config).context("building collector")?;
    let source: Source = Arc::new(MetricsExporter::new(collector, hostname));

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        info!("Tripplite UPS Prometheus Exporter - listening on {port}");
        axum::serve(listener, router(source))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("metrics server error")
    })?;
    Ok(())
}

fn router(source: Source) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(source)
}

/// GET /metrics. Scrapes run on the blocking pool; HID reads block.
async fn metrics_handler(State(source): State<Source>) -> Result<String, (StatusCode, String)> {
    let scraped = tokio::task::spawn_blocking(move || source.scrape())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("scrape task failed: {e}")))?;
    scraped.map_err(|e| {
        error!("scrape failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down ...");
}
