//! HTTP surface of the exporter: landing page, health check and the metrics
//! endpoint that triggers one scrape cycle per pull.

use crate::collectors::{config::CollectorConfig, registry::CollectorRegistry};
use anyhow::{Context, Result, anyhow};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// One connection is enough: a scrape runs the liveness probe and the status
/// query sequentially, and the connection is released back between pulls.
const POOL_SIZE: u32 = 1;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

struct AppState {
    registry: CollectorRegistry,
    pool: MySqlPool,
    metrics_path: String,
}

/// Start the exporter: build the lazy `searchd` pool, register the enabled
/// collectors and serve HTTP until the task is aborted.
///
/// The pool is lazy on purpose: the exporter must come up and serve
/// `sphinx_up 0` while `searchd` is unreachable, and keep retrying on every
/// pull.
///
/// # Errors
///
/// Returns an error if the DSN cannot be parsed, metric registration fails
/// or the listener cannot bind.
#[allow(clippy::needless_pass_by_value)]
pub async fn new(
    port: u16,
    listen: Option<String>,
    metrics_path: String,
    dsn: SecretString,
    collectors: Vec<String>,
) -> Result<()> {
    // Routing "/" twice would panic inside the router; fail up front.
    if metrics_path == "/" {
        return Err(anyhow!(
            "metrics path cannot be \"/\", it is reserved for the landing page"
        ));
    }

    let pool = MySqlPoolOptions::new()
        .max_connections(POOL_SIZE)
        .min_connections(0)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy(dsn.expose_secret())
        .context("invalid searchd DSN")?;

    let config = CollectorConfig::new().with_enabled(&collectors);
    let registry = CollectorRegistry::new(&config)?;

    // Descriptor discovery runs one real scrape; when searchd is down this
    // only shows the bookkeeping families, which is fine.
    let families = registry.probe(&pool).await;
    info!(families = families.len(), "initial scrape probe complete");

    let state = Arc::new(AppState {
        registry,
        pool,
        metrics_path: metrics_path.clone(),
    });

    let app = Router::new()
        .route("/", get(landing))
        .route(&metrics_path, get(metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = bind(port, listen).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.map_err(Into::into)
}

async fn bind(port: u16, listen: Option<String>) -> Result<TcpListener> {
    match listen {
        Some(listen) => {
            let ip: IpAddr = listen
                .parse()
                .with_context(|| format!("invalid listen address {listen}"))?;
            TcpListener::bind(SocketAddr::new(ip, port))
                .await
                .with_context(|| format!("failed to bind {listen}:{port}"))
        }
        // Auto-detect: prefer the dual-stack wildcard, fall back to IPv4.
        None => match TcpListener::bind(("::", port)).await {
            Ok(listener) => Ok(listener),
            Err(_) => TcpListener::bind(("0.0.0.0", port))
                .await
                .with_context(|| format!("failed to bind port {port}")),
        },
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, StatusCode> {
    state.registry.scrape(&state.pool).await;
    state.registry.encode().map_err(|e| {
        error!(error = %e, "failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// Handlers must be async for axum even when they never await.
#[allow(clippy::unused_async)]
async fn health() -> &'static str {
    "OK"
}

#[allow(clippy::unused_async)]
async fn landing(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Sphinx exporter</title></head>\n<body>\n<h1>Sphinx exporter</h1>\n<p><a href=\"{}\">Metrics</a></p>\n</body>\n</html>",
        state.metrics_path
    ))
}
