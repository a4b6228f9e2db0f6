//! sunoctl - operator CLI for the self-hosted suno stack.
//!
//! Rotates the fragile session cookie kept in the stack's env file and
//! diagnoses the deployment when it stops producing music.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sunoctl::commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "sunoctl")]
#[command(about = "Suno stack - credential rotation and health diagnostics", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rotate the stored session cookie (prompts for the new value)
    Rotate,

    /// Store a raw value for one env key, without escaping
    Update { key: String, value: String },

    /// Re-escape the stored cookie for compose interpolation
    Fix,

    /// Run the stack diagnostics and print a report
    Doctor {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show stored credential state without rotating
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Rotate => commands::rotate().await,
        Commands::Update { key, value } => commands::update(&key, &value).await,
        Commands::Fix => commands::fix().await,
        Commands::Doctor { json } => commands::doctor(json).await,
        Commands::Status => commands::status().await,
    }
}
