//! Airgrid Service - HTTP API for the feedback workflow.
//!
//! Run with: `cargo run -p airgrid-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use airgrid_core::StoreHandle;
use airgrid_service::{AppState, Config, api, middleware};
use airgrid_store::Store;

/// Airgrid Service - HTTP API for the feedback workflow.
#[derive(Parser, Debug)]
#[command(name = "airgrid-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("airgrid_service=info".parse()?)
                .add_directive("airgrid_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    config.validate()?;

    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;
    store.set_busy_timeout(config.storage.busy_timeout())?;
    let handle = StoreHandle::new(store)
        .acquire_timeout(config.storage.acquire_timeout())
        .retry(config.retry.to_retry_config());

    let ranges = config.range_table()?;
    info!("Loaded {} classification levels", ranges.ranges().len());

    let state = AppState::new(handle, ranges, config.security.clone());

    let (provinces, cities) = config.locations();
    if !provinces.is_empty() {
        state.services.directory.seed(&provinces, &cities).await?;
        info!(
            "Seeded {} provinces and {} cities",
            provinces.len(),
            cities.len()
        );
    }

    let app = Router::new()
        .merge(api::router())
        .layer(from_fn_with_state(
            Arc::clone(&state.security),
            middleware::api_key_auth,
        ))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.server.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = config.server.bind.parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
