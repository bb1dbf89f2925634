//! # Claimsight CLI
//!
//! The `claimsight` binary is the primary interface for the damage
//! assessment service. It provides commands for database initialization,
//! one-shot image analysis, history listing, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! claimsight --config ./config/claimsight.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `claimsight init` | Create the SQLite database and run schema migrations |
//! | `claimsight analyze <image>` | Assess a local photo end to end |
//! | `claimsight history` | List stored assessments, most recent first |
//! | `claimsight serve` | Start the HTTP server |

mod analyze;
mod config;
mod db;
mod decode;
mod history;
mod migrate;
mod models;
mod normalize;
mod numeric;
mod server;
mod store;
mod uploads;
mod vision;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Claimsight CLI — vehicle damage assessment backed by vision-language
/// models.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/claimsight.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "claimsight",
    about = "Claimsight — vehicle damage assessment backed by vision-language models",
    version,
    long_about = "Claimsight accepts photographs of damaged vehicles, queries a vision-language \
    model for an assessment, and normalizes the model's free-form answer into stable records \
    (damage type, location, cost estimates in three currencies, notes) served over a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/claimsight.toml`. Database, uploads, model,
    /// and server settings are read from this file; API keys come from the
    /// environment.
    #[arg(long, global = true, default_value = "./config/claimsight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the analyses table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Analyze a local image file.
    ///
    /// Stores the image in the uploads directory, queries the configured
    /// vision model, normalizes the answer, persists a record, and prints
    /// the result.
    Analyze {
        /// Path to the image file to assess.
        image: PathBuf,
    },

    /// List stored assessments, most recent first.
    History,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// analyze, history, and uploads endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("claimsight=info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Analyze { image } => {
            analyze::run_analyze(&cfg, &image).await?;
        }
        Commands::History => {
            history::run_history(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
