//! # Crewline Ops
//!
//! Operator entry point for the Crewline engine: schema migrations,
//! invitation expiry sweeps, deletion previews and database health checks.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p crewline-ops -- migrate
//! cargo run -p crewline-ops -- expire-invitations
//! cargo run -p crewline-ops -- deletion-impact 5b7c...-...
//! cargo run -p crewline-ops -- health
//! ```
//!
//! Configuration comes from the environment (see `crewline_shared::config`).

mod commands;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::Cli;
use crewline_shared::config::{EngineConfig, LogFormat};
use crewline_shared::db::{migrations, pool};

fn init_tracing(format: LogFormat) {
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewline_ops=info,crewline_shared=info".into()),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = Cli::parse().command;

    let config = EngineConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        ?command,
        "Crewline ops starting"
    );

    if command.creates_database() {
        migrations::ensure_database_exists(&config.database.url)
            .await
            .context("Failed to create database")?;
    }

    let db = pool::create_pool(config.database.clone())
        .await
        .context("Failed to connect to database")?;

    let result = commands::run(command, &config, db.clone()).await;
    pool::close_pool(db).await;
    result
}
