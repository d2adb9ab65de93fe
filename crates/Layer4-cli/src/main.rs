//! Elite - operator console for a Covenant team server

mod render;
mod repl;

use clap::Parser;
use elite_console::{Console, Remote};
use elite_foundation::EliteConfig;
use elite_provider::CovenantClient;
use elite_task::LocalDataDirectory;
use render::Printer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Elite - interact with Grunts on a Covenant team server
#[derive(Parser, Debug)]
#[command(name = "elite")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Team server URL (e.g. https://localhost:7443)
    #[arg(short, long)]
    url: Option<String>,

    /// API token (overrides config; ELITE_TOKEN is used when neither is set)
    #[arg(long)]
    token: Option<String>,

    /// Accept self-signed team server certificates
    #[arg(long)]
    insecure: bool,

    /// Directory file-import commands read from
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Interact with this Grunt right away
    #[arg(short, long)]
    agent: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Save the effective connection settings to the global config
    #[arg(long)]
    save_config: bool,
}

impl Args {
    /// Command-line flags win over every config layer
    fn apply(&self, mut config: EliteConfig) -> EliteConfig {
        if let Some(url) = &self.url {
            config = config.with_base_url(url.clone());
        }
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir.clone());
        }
        if self.insecure {
            config.insecure = Some(true);
        }
        if self.no_color {
            config.color = Some(false);
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr keeps console output clean)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration
    let config = EliteConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}", e);
        EliteConfig::default()
    });
    let config = args.apply(config);

    if args.save_config {
        config.save_global()?;
        info!("Configuration saved");
    }
    let config = config.with_token_fallback(|key| std::env::var(key).ok());

    let client = CovenantClient::from_config(&config)?;
    let data_dir = config.data_dir();
    info!("Team server: {}", client.base_url());
    info!("Data directory: {}", data_dir.display());

    let console = Console::new(
        Remote::new(Arc::new(client)),
        Arc::new(LocalDataDirectory::new(data_dir)),
    );
    repl::run(console, Printer::new(config.color()), args.agent).await
}
