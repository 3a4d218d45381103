//! # PixelPals Server
//!
//! Serves the shared canvas document. Binds to localhost unless told otherwise.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use pixel_core::CanvasConfig;
use pixel_renderer::GridRenderer;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pixel_server::{metrics, AppState, DocumentHub};

/// Default port for the document server.
const DEFAULT_PORT: u16 = 9473;

/// Command line options. Every flag falls back to an environment variable.
#[derive(Debug, Parser)]
#[command(name = "pixelpals-server", version, about)]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PIXELPALS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind.
    #[arg(long, env = "PIXELPALS_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    bind: IpAddr,

    /// Directory for the persisted document. In-memory only when unset.
    #[arg(long, env = "PIXELPALS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Required grid rows. Accepts any size when unset.
    #[arg(long, env = "PIXELPALS_ROWS", requires = "cols")]
    rows: Option<usize>,

    /// Required grid columns.
    #[arg(long, env = "PIXELPALS_COLS", requires = "rows")]
    cols: Option<usize>,

    /// Cell edge length for PNG snapshots.
    #[arg(long, env = "PIXELPALS_CELL_SIZE", default_value_t = CanvasConfig::default().cell_size)]
    cell_size: u32,

    /// Extra browser origins allowed by CORS.
    #[arg(long = "allow-origin", env = "PIXELPALS_ALLOW_ORIGINS", value_delimiter = ',')]
    allow_origins: Vec<String>,
}

/// Build a CORS layer for localhost plus any configured origins.
fn build_cors_layer(port: u16, extra: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://localhost:{port}"),
        format!("http://127.0.0.1:{port}"),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
    .iter()
    .chain(extra)
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,pixel_server=debug,tower_http=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pixel_server=debug,tower_http=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn build_hub(args: &Args) -> anyhow::Result<DocumentHub> {
    let hub = match &args.data_dir {
        Some(dir) => {
            tracing::info!("Persisting document under {}", dir.display());
            DocumentHub::with_data_dir(dir)
                .with_context(|| format!("failed to open data dir {}", dir.display()))?
        }
        None => {
            tracing::warn!("No data dir configured; the document lives in memory only");
            DocumentHub::new()
        }
    };
    Ok(match (args.rows, args.cols) {
        (Some(rows), Some(cols)) => {
            tracing::info!(rows, cols, "Enforcing grid dimensions");
            hub.with_dimensions(rows, cols)
        }
        _ => hub,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let metrics_handle = metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to initialize Prometheus metrics: {}", e))?;
    tracing::info!("Prometheus metrics initialized");

    let hub = build_hub(&args)?;
    let renderer = GridRenderer::new(args.cell_size).context("invalid cell size")?;
    let state = AppState::new(hub).with_renderer(renderer);

    let app = pixel_server::app(state, metrics_handle)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(build_cors_layer(args.port, &args.allow_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    if !args.bind.is_loopback() {
        tracing::warn!("Listening on non-loopback address {}", addr);
    }
    tracing::info!("PixelPals server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
