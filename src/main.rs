//! # BriefBot
//!
//! Morning digest for one Telegram chat: weather, gold/silver, BTC/ETH and
//! favorite-team fixtures.
//!
//! Usage:
//!   briefbot serve                 # Timer + HTTP trigger (/run, /run?dry=1)
//!   briefbot run                   # One scheduled invocation, then exit
//!   briefbot preview               # Print today's digest without sending
//!   briefbot --config ./bot.toml serve

use anyhow::{Context, Result};
use briefbot_channels::TelegramSender;
use briefbot_core::{BriefConfig, Clock, DigestSource, KvStore, SystemClock};
use briefbot_scheduler::{DeliveryCore, Schedule};
use briefbot_sources::DigestBuilder;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "briefbot", version, about = "📌 BriefBot: daily digest to Telegram")]
struct Cli {
    /// Config file (default: $BRIEFBOT_CONFIG or ~/.briefbot/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the timer and the HTTP trigger
    Serve,
    /// Run one scheduled invocation and exit
    Run,
    /// Print the digest without sending anything
    Preview,
}

/// Everything built from config once at startup.
struct App {
    config: Arc<BriefConfig>,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    client: reqwest::Client,
    digest: Arc<DigestBuilder>,
}

impl App {
    fn build(config: BriefConfig) -> Result<Self> {
        let config = Arc::new(config);
        let store = briefbot_store::open(&config.store)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let client =
            briefbot_sources::http::build_client(&config.user_agent, config.http_timeout_secs)?;
        let digest =
            DigestBuilder::from_config(&config, client.clone(), store.clone(), clock.clone())?;
        Ok(Self {
            config,
            store,
            clock,
            client,
            digest: Arc::new(digest),
        })
    }

    /// Delivery core wired to Telegram. Fails without credentials.
    fn delivery(&self) -> Result<Arc<DeliveryCore>> {
        self.config.validate_delivery()?;
        let sender = TelegramSender::from_config(&self.config.telegram, self.client.clone())?;
        let core = DeliveryCore::new(
            self.store.clone(),
            Arc::new(sender),
            self.digest.clone(),
            self.clock.clone(),
            self.config.tz()?,
        )
        .with_daily_dedupe(self.config.daily_dedupe);
        Ok(Arc::new(core))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "briefbot=debug,tower_http=debug"
    } else {
        "briefbot=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => BriefConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => BriefConfig::load()?,
    };
    let app = App::build(config)?;

    match cli.command {
        Command::Preview => {
            println!("{}", app.digest.build().await);
        }
        Command::Run => {
            let core = app.delivery()?;
            let outcome = core.run_scheduled().await?;
            tracing::info!("📌 Run finished: {outcome}");
        }
        Command::Serve => {
            let core = app.delivery()?;
            let tz = app.config.tz()?;
            let schedule = Schedule::parse_all(&app.config.schedule.cron)?;
            tracing::info!(
                "🚀 BriefBot starting for {} ({tz}), store: {}",
                app.config.city,
                app.store.name()
            );

            let timer = tokio::spawn(briefbot_scheduler::run_timer(
                core.clone(),
                schedule,
                tz,
                app.clock.clone(),
                app.store.clone(),
                Duration::from_secs(app.config.schedule.sweep_interval_secs),
            ));

            tokio::select! {
                result = briefbot_gateway::start(&app.config.gateway, core) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("👋 Shutting down");
                }
            }
            timer.abort();
        }
    }

    Ok(())
}
