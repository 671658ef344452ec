//! Promptgate - HTTP relay for the Gemini API

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use promptgate::config::Config;
use promptgate::error::Result;
use promptgate::gateway::{BasicAuth, GateServer};
use promptgate::provider::GeminiProvider;

/// Promptgate - relay prompts to Gemini and normalize the replies
#[derive(Parser)]
#[command(name = "promptgate")]
#[command(about = "A small HTTP relay that fronts the Gemini API and normalizes its replies")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the relay server (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,promptgate=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    tracing::info!("Starting Promptgate");

    let config = Config::load(config_path.as_deref())?;
    tracing::debug!("Config loaded: {:?}", config);

    let provider = GeminiProvider::new(
        &config.provider,
        Duration::from_secs(config.server.timeout_secs),
    )?;
    let server_credential = config.provider.server_credential();
    let auth = BasicAuth::from_env(&config.auth);

    let server = GateServer::new(config, Arc::new(provider), server_credential, auth);
    server.serve().await?;

    tracing::info!("Promptgate stopped");
    Ok(())
}
