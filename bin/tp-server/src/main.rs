//! textpace Server
//!
//! Accepts message send requests over HTTP and delivers them in the
//! background with randomized pacing between sends.
//!
//! ## Endpoints
//!
//! - `POST /sendMessage` - one recipient, several messages
//! - `POST /sendBulkMessages` - several recipients, same messages
//! - `GET /health`
//! - `GET /api-doc/openapi.json`
//!
//! Configuration comes from `textpace.toml` (see `--print-config`) and the
//! environment; `.env` is loaded when present.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tp_config::{AppConfig, ConfigLoader};
use tp_dispatch::{create_delivery_client, create_router, ApiKeyAuth, AppState, Dispatcher, PacingPolicy};
use tracing::{error, info, warn};

/// textpace HTTP server
#[derive(Parser, Debug)]
#[command(name = "tp-server")]
#[command(about = "Paced text message dispatch over HTTP")]
struct Args {
    /// Path to a TOML config file
    #[arg(long, short = 'c', env = "TEXTPACE_CONFIG")]
    config: Option<PathBuf>,

    /// Print an example config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for local development)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    if args.print_config {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    tp_common::logging::init_logging("tp-server");

    info!("Starting textpace server");

    let loader = match args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    if config.auth.uses_default_key() {
        warn!("API_KEY is not set - using the built-in default key. Set API_KEY before exposing this server.");
    }

    let client = create_delivery_client(&config.delivery)?;
    let pacing = PacingPolicy::from(&config.pacing);

    let mut dispatcher = Dispatcher::new(client, pacing);
    if let Some(max_jobs) = config.dispatch.max_concurrent_jobs {
        info!(max_concurrent_jobs = max_jobs, "Dispatch concurrency capped");
        dispatcher = dispatcher.with_max_concurrent_jobs(max_jobs);
    }
    let dispatcher = Arc::new(dispatcher);

    let app = create_router(AppState {
        dispatcher: dispatcher.clone(),
        auth: ApiKeyAuth::new(config.auth.api_key.as_str()),
    })
    .layer(TraceLayer::new_for_http());

    let addr = config.http.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        backend = ?config.delivery.backend,
        min_delay_ms = pacing.min_delay().as_millis() as u64,
        max_delay_ms = pacing.max_delay().as_millis() as u64,
        "textpace server listening. Press Ctrl+C to shutdown."
    );

    let shutdown_dispatcher = dispatcher.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Requests still draining get a 500 instead of starting new jobs
            shutdown_dispatcher.stop_accepting();
        })
        .await?;

    let in_flight = dispatcher.in_flight_jobs();
    if in_flight > 0 {
        warn!(in_flight_jobs = in_flight, "Shutting down with dispatch jobs still running; remaining messages will not be sent");
    }

    info!("textpace server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received...");
}
