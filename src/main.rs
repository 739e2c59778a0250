//! # Sponsorship Proposals Service
//!
//! `proposals serve` (the default) runs the HTTP server; `proposals migrate`
//! applies pending database migrations and exits.

use anyhow::Context;
use clap::{Parser, Subcommand};
use proposals::{config::ConfigLoader, db, migration::Migrator, server::run_server, telemetry};
use sea_orm_migration::MigratorTrait;

#[derive(Debug, Parser)]
#[command(name = "proposals", version, about = "Multi-tenant sponsorship proposal hosting")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Apply pending migrations before serving
        #[arg(long)]
        migrate: bool,
    },
    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config)?;

    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Loaded configuration");
    }
    tracing::info!(profile = %config.profile, "Configuration loaded");

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or(Command::Serve { migrate: false }) {
        Command::Migrate => {
            Migrator::up(&db, None).await.context("applying migrations")?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Serve { migrate } => {
            if migrate {
                Migrator::up(&db, None).await.context("applying migrations")?;
            }
            run_server(config, db).await
        }
    }
}
