//! Journal Desk server entrypoint.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use journal_desk_backend::api::{build_router, AppState};
use journal_desk_backend::config::{Config, LogFormat};
use journal_desk_backend::services::metrics_service;
use journal_desk_backend::storage::build_storage;

#[derive(Parser)]
#[command(name = "journal-desk", version, about = "Journal Desk editorial backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env().context("loading configuration")?;

    init_tracing(config.log_format);

    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("running migrations")?;
    tracing::info!("Database migrations applied");

    if let Some(Command::Migrate) = cli.command {
        return Ok(());
    }

    let metrics = metrics_service::install_recorder()?;
    let storage = build_storage(&config)?;
    let bind_address = config.bind_address.clone();
    if config.read_only {
        tracing::warn!("Read-only mode enabled, write requests will be rejected");
    }

    let state = Arc::new(AppState::new(db, config, storage, metrics));
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {}", bind_address))?;
    tracing::info!(address = %bind_address, "Journal Desk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("journal_desk_backend=info,journal_desk=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
