//! CropWatch Outbreak Engine - main entry point

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cropwatch_common::config;
use cropwatch_common::db::init_database;
use cropwatch_common::params::AlertingParams;
use cropwatch_oe::api;
use cropwatch_oe::engine;
use cropwatch_oe::state::AppState;

/// Command-line arguments for cropwatch-oe
#[derive(Parser, Debug)]
#[command(name = "cropwatch-oe")]
#[command(about = "Crop disease outbreak detection and alerting engine")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CROPWATCH_PORT")]
    port: Option<u16>,

    /// Data directory holding the engine database
    #[arg(short, long, env = "CROPWATCH_ROOT")]
    root_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, env = "CROPWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cropwatch_oe=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting CropWatch Outbreak Engine v{}", env!("CARGO_PKG_VERSION"));

    let file_config = config::load_file_config_opt(args.config.as_deref())
        .context("Failed to load config file")?;
    let root_dir = config::resolve_root_dir(args.root_dir.as_deref(), &file_config);
    let port = config::resolve_port(args.port, &file_config);
    let db_path = config::database_path(&root_dir, &file_config);
    info!("Data directory: {}", root_dir.display());

    let db = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let params = AlertingParams::load(&db)
        .await
        .context("Failed to load alerting parameters")?;
    info!(
        alert_threshold = params.alert_threshold,
        prone_threshold = params.prone_threshold,
        default_radius_km = params.default_radius_km,
        "Alerting parameters loaded"
    );

    let state = AppState::new(db, params);

    // seed the derived snapshot before accepting queries
    engine::recompute(&state)
        .await
        .context("Failed to build initial cluster snapshot")?;
    let engine_rx = state.subscribe();
    tokio::spawn(engine::run(state.clone(), engine_rx));

    let app = api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
