// model-gate-cli/src/main.rs
// ============================================================================
// Module: Model Gate CLI Entry Point
// Description: Command dispatcher for gateway and store workflows.
// Purpose: Run the gateway, seed SQLite stores, and validate configuration.
// Dependencies: clap, model-gate-api, model-gate-config, model-gate-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The Model Gate CLI runs the HTTP gateway (`serve`), seeds a durable
//! directory store with the fixture catalog (`seed`), and validates
//! configuration files (`config validate`). Failures exit with status one
//! and a single-line error on stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use model_gate_api::GatewayServer;
use model_gate_config::GatewayConfig;
use model_gate_core::runtime::fixture_identities;
use model_gate_core::runtime::fixture_models;
use model_gate_store_sqlite::SqliteDirectoryStore;
use model_gate_store_sqlite::SqliteStoreConfig;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Model Gate command-line interface.
#[derive(Debug, Parser)]
#[command(name = "model-gate", version, about = "Access-control gateway for AI model backends")]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Seed a SQLite directory store with the fixture catalog.
    Seed {
        /// Path to the directory store database.
        #[arg(long)]
        store: PathBuf,
    },
    /// Configuration utilities.
    Config {
        /// Configuration subcommand to execute.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve {
            config,
        } => run_serve(config).await,
        Command::Seed {
            store,
        } => run_seed(&store),
        Command::Config {
            command: ConfigCommand::Validate {
                config,
            },
        } => run_config_validate(config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let _ = write_stderr_line(&message);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the HTTP gateway until it fails or is interrupted.
async fn run_serve(config_path: Option<PathBuf>) -> Result<(), String> {
    let config =
        GatewayConfig::load(config_path.as_deref()).map_err(|err| err.to_string())?;
    let bind = config.server.bind.clone();
    let server = GatewayServer::from_config(config).map_err(|err| err.to_string())?;
    let _ = write_stderr_line(&format!("model-gate: serving on {bind}"));
    server.serve().await.map_err(|err| err.to_string())
}

/// Seeds a SQLite directory store with the fixture catalog.
fn run_seed(store_path: &Path) -> Result<(), String> {
    let store = SqliteDirectoryStore::new(&SqliteStoreConfig::new(store_path.to_path_buf()))
        .map_err(|err| err.to_string())?;
    let identities = fixture_identities();
    let models = fixture_models();
    for identity in &identities {
        store.upsert_identity(identity).map_err(|err| err.to_string())?;
    }
    for model in &models {
        store.upsert_model(model).map_err(|err| err.to_string())?;
    }
    write_stdout_line(&format!(
        "seeded {} identities and {} models into {}",
        identities.len(),
        models.len(),
        store_path.display()
    ))
    .map_err(|err| err.to_string())
}

/// Loads and validates a configuration file, printing a short summary.
fn run_config_validate(config_path: Option<PathBuf>) -> Result<(), String> {
    let config =
        GatewayConfig::load(config_path.as_deref()).map_err(|err| err.to_string())?;
    write_stdout_line(&format!(
        "config ok: bind={} environment={} directory={} audit={} fallback={}",
        config.server.bind,
        config.server.environment.as_str(),
        config.directory.store.as_str(),
        config.audit.store.as_str(),
        config.backend.fallback_on_backend_error
    ))
    .map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
