//! Operator commands
//!
//! Each command gets the loaded configuration and an open pool, does one
//! thing and prints its result as JSON on stdout.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crewline_shared::collaborators::http::{HttpRecommendationNotifier, HttpSkillExtractor};
use crewline_shared::config::EngineConfig;
use crewline_shared::db::{migrations, pool};
use crewline_shared::engine::Engine;
use crewline_shared::store::PgStore;

/// Crewline operator tool
#[derive(Debug, Parser)]
#[command(name = "crewline-ops")]
#[command(version)]
#[command(about = "Operator commands for the Crewline engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create the database if needed and apply migrations
    Migrate,

    /// Expire every overdue pending invitation
    ExpireInvitations,

    /// Show what deleting a user would do, without doing it
    DeletionImpact {
        /// User to inspect
        user_id: Uuid,
    },

    /// Check database connectivity
    Health,
}

impl Command {
    /// Whether the command must create the database before connecting
    pub fn creates_database(&self) -> bool {
        matches!(self, Command::Migrate)
    }
}

/// Builds an engine over the pool, with HTTP collaborators when configured
pub fn build_engine(config: &EngineConfig, pool: PgPool) -> anyhow::Result<Engine> {
    let mut builder =
        Engine::builder(Arc::new(PgStore::new(pool))).settings(config.engine.clone());

    if let Some(url) = &config.text_analysis_url {
        let extractor = HttpSkillExtractor::new(url, config.collaborator_timeout)
            .context("Failed to build text-analysis client")?;
        builder = builder.extractor(Arc::new(extractor));
    }
    if let Some(url) = &config.recommendation_url {
        let notifier = HttpRecommendationNotifier::new(url, config.collaborator_timeout)
            .context("Failed to build recommendation client")?;
        builder = builder.notifier(Arc::new(notifier));
    }

    Ok(builder.build())
}

pub async fn run(command: Command, config: &EngineConfig, pool: PgPool) -> anyhow::Result<()> {
    match command {
        Command::Migrate => migrate(&pool).await,
        Command::Health => health(&pool).await,
        Command::ExpireInvitations => {
            let engine = build_engine(config, pool)?;
            let expired = engine.invitations().expire_stale_invitations().await?;
            print_json(&json!({ "expired": expired }))
        }
        Command::DeletionImpact { user_id } => {
            let engine = build_engine(config, pool)?;
            let impact = engine.lifecycle().get_deletion_impact(user_id).await?;
            if !impact.can_delete {
                warn!(%user_id, reason = ?impact.reason, "User cannot be deleted");
            }
            print_json(&impact)
        }
    }
}

async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    migrations::run_migrations(pool)
        .await
        .context("Failed to apply migrations")?;

    let status = migrations::get_migration_status(pool).await?;
    info!(
        applied = status.applied_migrations,
        up_to_date = status.is_up_to_date,
        "Migrations complete"
    );
    print_json(&status)
}

async fn health(pool: &PgPool) -> anyhow::Result<()> {
    pool::health_check(pool)
        .await
        .context("Database health check failed")?;

    let stats = pool::get_pool_stats(pool);
    print_json(&json!({ "status": "ok", "pool": stats }))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
