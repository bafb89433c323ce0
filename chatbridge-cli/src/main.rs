//! CLI entry point for chatbridge

use anyhow::Result;
use chatbridge_core::config::{Config, ConfigLoader};
use chatbridge_core::logging::init_logging;
use chatbridge_manager::{run_server, AppState, ReconnectPolicy, SessionRegistry};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chatbridge")]
#[command(about = "WhatsApp multi-bot gateway with chat, jokes and quotes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
        /// Chat completion API key to store
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Run the bot sessions and the HTTP surface
    Gateway,
    /// Show configured sessions and effective settings
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Onboard { force, api_key } => run_onboard(&config_loader, force, api_key),
        Commands::Gateway => run_gateway(&config_loader).await,
        Commands::Status => run_status(&config_loader),
    }
}

fn run_onboard(loader: &ConfigLoader, force: bool, api_key: Option<String>) -> Result<()> {
    println!("{}", style("Welcome to chatbridge!").bold().cyan());

    let config_path = loader.config_path();
    if config_path.exists() && !force {
        println!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    let mut config = Config::default();
    if let Some(key) = api_key {
        config.providers.openai.api_key = key;
    }
    loader.save(&config)?;

    println!(
        "{} {}",
        style("Configuration written to").green(),
        config_path.display()
    );
    println!("Sessions: {}", config.sessions.names.join(", "));
    println!("Edit the file, then run `chatbridge gateway`.");
    Ok(())
}

async fn run_gateway(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    let _guard = init_logging(&config.logging);

    println!("{}", style("Starting chatbridge gateway...").bold().cyan());
    println!("Sessions: {}", config.sessions.names.join(", "));
    println!("Bridge: {}", config.bridge.bridge_url);

    let registry = Arc::new(SessionRegistry::from_config(&config));
    if config.sessions.eager_start {
        info!("Starting all sessions eagerly");
        registry.start_all().await?;
    }

    let state = AppState::new(registry.clone(), &config.gateway);
    println!(
        "\n{} {}",
        style("Gateway is running. Press Ctrl+C to stop.").green(),
        state.base_url
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };
    let served = run_server(state, &config.gateway.host, config.gateway.port, shutdown).await;

    info!("Shutting down sessions");
    registry.shutdown().await;
    println!("{}", style("Gateway stopped.").dim());
    served
}

fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("chatbridge Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    let file_status = if loader.config_path().exists() {
        style("found").green()
    } else {
        style("not found, using defaults").yellow()
    };
    println!("  Config file: {} ({})", loader.config_path().display(), file_status);
    println!();

    println!("{}", style("Sessions:").bold());
    for name in &config.sessions.names {
        println!("  {}", name);
    }
    let start = if config.sessions.eager_start {
        "eager"
    } else {
        "on first access"
    };
    println!("  Start: {}", start);
    println!();

    println!("{}", style("Bridge:").bold());
    println!("  URL: {}", config.bridge.bridge_url);
    if config.bridge.allow_from.is_empty() {
        println!("  Allowed senders: {}", style("everyone").dim());
    } else {
        println!("  Allowed senders: {}", config.bridge.allow_from.join(", "));
    }
    println!();

    println!("{}", style("Chat completion:").bold());
    let key_status = if config.providers.openai.api_key.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", key_status);
    println!("  API base: {}", config.providers.openai.api_base);
    println!("  Model: {}", config.providers.openai.model);
    match config.conversation.history_window() {
        Some(window) => println!("  History window: {} entries", window),
        None => println!("  History window: unbounded"),
    }
    println!();

    let policy = ReconnectPolicy::from_config(&config.reconnect);
    println!("{}", style("Reconnect:").bold());
    println!(
        "  First delay: {:?}, then up to {:?}",
        policy.delay(0),
        policy.delay(u32::MAX)
    );
    println!();

    println!("{}", style("Gateway:").bold());
    println!("  Listen: {}:{}", config.gateway.host, config.gateway.port);
    println!("  Public URL: {}", config.gateway.public_base_url());
    println!("  QR wait: {:?}", config.gateway.qr_wait());

    Ok(())
}
