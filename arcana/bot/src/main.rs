//! Arcana Bot
//!
//! Telegram front end for the arcana card-draw engine: long-polls the
//! Bot API and routes commands to the Oracle.
//!
//! # Usage
//!
//! ```bash
//! # Token from the environment
//! TELEGRAM_BOT_TOKEN=123:abc arcana-bot --deck arcana_deck.txt
//!
//! # With verbose logging
//! RUST_LOG=debug arcana-bot
//! ```
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN`: bot token (required)
//! - `ARCANA_DECK`: deck file path
//! - `ARCANA_DATA_DIR`: profile/share data directory
//! - `ARCANA_CONFIG`: TOML config overlay
//! - `ARCANA_SEED`, `ARCANA_PACING_SCALE`, `ARCANA_SHARE_DIR`,
//!   `ARCANA_BACKGROUND`, `ARCANA_FONT`: engine settings
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGINT (ctrl-c): graceful shutdown after the in-flight poll

mod dispatch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use arcana_core::config::{default_data_dir, OracleConfig};
use arcana_core::deck::Deck;
use arcana_core::oracle::Oracle;
use arcana_core::profile::ProfileStore;
use arcana_core::TelegramChannel;

use dispatch::Dispatcher;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "arcana-bot", about = "Animated card-draw bot")]
struct Args {
    /// Telegram bot token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// Deck file, one card per line.
    #[arg(long, env = "ARCANA_DECK", default_value = "arcana_deck.txt")]
    deck: PathBuf,

    /// Data directory for profiles (defaults to the platform data dir).
    #[arg(long, env = "ARCANA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Optional TOML configuration overlay.
    #[arg(long, env = "ARCANA_CONFIG")]
    config: Option<PathBuf>,

    /// Long-poll timeout in seconds.
    #[arg(long, default_value_t = 50)]
    poll_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arcana_bot=info".parse()?)
                .add_directive("arcana_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    info!("Starting arcana bot");

    let deck = if args.deck.exists() {
        Deck::load(&args.deck)?
    } else {
        warn!(path = %args.deck.display(), "deck file missing, starting with an empty deck");
        Deck::default()
    };
    info!(cards = deck.len(), path = %args.deck.display(), "deck loaded");

    let config = OracleConfig::load(args.config.as_deref())?;
    let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    let profiles = Arc::new(ProfileStore::open(data_dir.join("user_prefs.json")));
    info!(profiles = profiles.len(), dir = %data_dir.display(), "profiles loaded");

    let channel = Arc::new(TelegramChannel::new(&args.token));
    let oracle = Arc::new(Oracle::new(Arc::clone(&channel), deck, config));
    let dispatcher = Dispatcher::new(
        Arc::clone(&channel),
        oracle,
        profiles,
        args.deck.clone(),
    );

    let mut offset = 0i64;
    loop {
        tokio::select! {
            result = channel.get_updates(offset, args.poll_timeout) => match result {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        dispatcher.dispatch(update);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "poll failed, backing off");
                    tokio::time::sleep(Duration::from_secs(3)).await;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
