//! procflow - BusinessWorks process diagram toolkit

mod diagram_cli;
mod inspect_cli;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "procflow")]
#[command(about = "Flow and integration diagrams for BusinessWorks processes", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// PlantUML diagram generation
    #[command(subcommand)]
    Diagram(diagram_cli::DiagramCommands),
    /// Process structure inspection
    #[command(subcommand)]
    Inspect(inspect_cli::InspectCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries diagram text, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Diagram(cmd) => diagram_cli::run(cmd).await?,
        Commands::Inspect(cmd) => inspect_cli::run(cmd)?,
    }

    Ok(())
}
