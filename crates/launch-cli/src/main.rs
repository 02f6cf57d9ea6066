mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "launch")]
#[command(version, about = "Launch CLI - run serverless functions locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the functions directory of a project
    Functions {
        /// Port to run the server on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Project directory containing `functions/` (defaults to the current directory)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    match cli.command {
        Commands::Functions { port, data_dir } => {
            commands::functions::execute(port, data_dir)?;
        }
    }

    Ok(())
}
