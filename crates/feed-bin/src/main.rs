//! livefeed - follow and post to a live message feed from the terminal.

mod commands;
mod input;
mod renderer;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use feed_config_and_utils::{init_logging, FeedConfig, Paths, TransportKind};
use tracing::debug;

/// Live feed client.
#[derive(Parser)]
#[command(name = "livefeed")]
#[command(about = "Follow and post to a live message feed")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Feed server base URL (overrides config and LIVEFEED_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Config file to use instead of ~/.livefeed/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the feed; lines typed on stdin are posted
    Watch {
        /// Transport strategy (push or pull)
        #[arg(short, long)]
        transport: Option<TransportKind>,
        /// Allow /delete
        #[arg(long)]
        admin: bool,
    },
    /// Post one message
    Send {
        /// Message text
        text: String,
        /// Attach an already uploaded image
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Delete one message
    Delete {
        /// Message ID
        id: String,
        /// Confirm admin privileges
        #[arg(long)]
        admin: bool,
    },
    /// Upload an image and print its URL
    Upload {
        /// Path to the image file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
        config.validate()?;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);
    debug!(base_url = %config.base_url, transport = %config.transport, "Configuration loaded");

    match cli.command {
        Commands::Watch { transport, admin } => {
            commands::watch::run(config, transport, admin).await?;
        }
        Commands::Send { text, image_url } => {
            commands::oneshot::send(&config, &text, image_url).await?;
        }
        Commands::Delete { id, admin } => {
            commands::oneshot::delete(&config, &id, admin).await?;
        }
        Commands::Upload { path } => {
            commands::oneshot::upload(&config, &path).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<FeedConfig> {
    let config = match path {
        Some(path) => {
            let mut config = FeedConfig::load_from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            config
        }
        None => FeedConfig::load(&Paths::new()?)?,
    };
    Ok(config)
}
