//! Parable CLI binary.
//!
//! This binary provides command-line access to Parable's functionality:
//! - Generate a story video for an idiom
//! - Browse and delete cataloged stories
//! - Clear the artifact cache

use clap::Parser;
use parable::{ParableConfig, Services};
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{
        Cli, Commands, handle_cache_command, handle_story_command, list_transitions, run_story,
        show_stats,
    };

    // API keys usually live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing; --verbose wins over RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Commands::Transitions = cli.command {
        list_transitions();
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => ParableConfig::from_file(path)?,
        None => ParableConfig::load()?,
    };
    let services = Services::open(config).await?;

    let result = match cli.command {
        Commands::Run {
            idiom,
            transition,
            composer,
            regenerate,
            format,
        } => run_story(&services, &idiom, transition, composer, regenerate, format).await,

        Commands::Stories(cmd) => handle_story_command(&services, cmd).await,

        Commands::Stats { format } => show_stats(&services, format).await,

        Commands::Cache(cmd) => handle_cache_command(&services, cmd).await,

        Commands::Transitions => Ok(()),
    };

    services.close().await?;
    result
}
