//! alinas CLI - Main Entry Point
//!
//! Validates, plans and applies NAS access rules and SMB ACL attachments
//! against the NAS management API, keeping each resource's state in a
//! local JSON file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod files;
mod output;

use commands::{apply, plan, schema, state, validate};

/// alinas - NAS access rule and SMB ACL management
#[derive(Parser)]
#[command(name = "alinas")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Provider settings (TOML); ALICLOUD_* variables override it
    #[arg(short, long, global = true, env = "ALINAS_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show resource schemas
    Schema(schema::SchemaArgs),

    /// Check a resource configuration offline
    Validate(commands::ConfigArgs),

    /// Show what apply would change
    Plan(plan::PlanArgs),

    /// Create, update or replace a resource
    Apply(apply::ApplyArgs),

    /// Re-read a resource and update its state file
    Refresh(state::StateArgs),

    /// Delete a resource and its state file
    Destroy(state::StateArgs),

    /// Adopt an existing object into a state file
    Import(state::ImportArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Schema(args) => schema::execute(args, format)?,
        Commands::Validate(args) => validate::execute(args, format)?,
        Commands::Plan(args) => plan::execute(args, format)?,
        Commands::Apply(args) => {
            let provider = commands::connect(config)?;
            apply::execute(args, &provider, format).await?
        }
        Commands::Refresh(args) => {
            let provider = commands::connect(config)?;
            state::refresh(args, &provider, format).await?
        }
        Commands::Destroy(args) => {
            let provider = commands::connect(config)?;
            state::destroy(args, &provider, format).await?
        }
        Commands::Import(args) => {
            let provider = commands::connect(config)?;
            state::import(args, &provider, format).await?
        }
    }

    Ok(())
}
