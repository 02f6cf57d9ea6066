use std::env;
use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use launch_functions::{Config, FunctionsServer, ServeOutcome};

pub fn execute(port: u16, data_dir: Option<PathBuf>) -> Result<()> {
    let project_root = match data_dir {
        Some(dir) => dir,
        None => env::current_dir()?,
    };

    let config = Config::load_from_project(&project_root)?;
    let server = FunctionsServer::new(&project_root).with_config(config).with_port(port);

    println!();
    println!("{}", "λ Starting serverless functions...".green().bold());
    println!("  {} Functions: {}", "📂".cyan(), server.functions_dir().display());
    println!();

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async move { server.serve_with_shutdown(shutdown_signal()).await })?;

    match outcome {
        ServeOutcome::NoFunctions => {
            println!("{}", "No Serverless functions detected.".yellow());
        }
        ServeOutcome::Stopped => {
            println!();
            println!("  {} Server stopped", "ℹ".cyan());
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
