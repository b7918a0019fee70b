use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use broker_feed_core::broker_time::{BrokerClock, DstRule};
use broker_feed_providers::bridge::BridgeProvider;
use broker_feed_server::config::{FeedArgs, FeedConfig};
use broker_feed_server::routes::create_router;
use broker_feed_server::service::FeedService;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "broker-feed",
    about = "Serve incremental candle and tick history from a trading terminal"
)]
struct Cli {
    #[command(flatten)]
    feed: FeedArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on
        #[arg(long, env = "BROKER_FEED_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },

    /// Fetch closed candles after a cutoff once and print them as JSON
    Ohlc {
        /// Exclusive UTC cutoff (epoch seconds)
        #[arg(long, default_value_t = 0)]
        since: i64,

        /// Bars requested per batch (defaults to --default-batch-size)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Fetch ticks around and after a cutoff once and print them as JSON
    Ticks {
        /// UTC cutoff (epoch seconds)
        #[arg(long, allow_negative_numbers = true)]
        since: i64,
    },

    /// Convert broker-clock timestamps to UTC
    Normalize {
        /// Broker epoch seconds
        #[arg(required = true, allow_negative_numbers = true)]
        timestamps: Vec<i64>,
    },
}

async fn connect(config: &FeedConfig) -> Result<FeedService> {
    let provider = BridgeProvider::new(config.bridge_url.clone());
    let service = FeedService::new(Box::new(provider), config);
    service
        .initialize()
        .await
        .with_context(|| format!("failed to initialize terminal bridge at {}", config.bridge_url))?;
    Ok(service)
}

async fn cmd_serve(config: &FeedConfig, bind: SocketAddr) -> Result<()> {
    let service = Arc::new(connect(config).await?);
    let router = create_router(service);

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(
        "Serving {} {} on http://{bind}",
        config.symbol, config.timeframe
    );
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}

async fn cmd_ohlc(config: &FeedConfig, since: i64, batch_size: Option<usize>) -> Result<()> {
    let service = connect(config).await?;
    let batch_size = batch_size.unwrap_or(config.default_batch_size);
    let candles = service
        .candles_since(since, batch_size)
        .await
        .context("candle fetch failed")?;
    println!("{}", serde_json::to_string_pretty(&candles)?);
    Ok(())
}

async fn cmd_ticks(config: &FeedConfig, since: i64) -> Result<()> {
    let service = connect(config).await?;
    let ticks = service
        .ticks_since(since)
        .await
        .context("tick fetch failed")?;
    println!("{}", serde_json::to_string_pretty(&ticks)?);
    Ok(())
}

fn describe(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "out of range".to_string())
}

fn cmd_normalize(config: &FeedConfig, timestamps: &[i64]) {
    let clock = BrokerClock::new(config.reference_zone);
    for &broker_ts in timestamps {
        let utc = clock.normalize(broker_ts);
        let dst = clock.rule().is_dst_at(broker_ts);
        println!(
            "{broker_ts} ({} broker) -> {utc} ({} UTC) [{} dst={dst}]",
            describe(broker_ts),
            describe(utc),
            config.reference_zone.zone().name(),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli
        .feed
        .into_config()
        .context("invalid configuration")?;

    match cli.command {
        Commands::Serve { bind } => cmd_serve(&config, bind).await?,
        Commands::Ohlc { since, batch_size } => cmd_ohlc(&config, since, batch_size).await?,
        Commands::Ticks { since } => cmd_ticks(&config, since).await?,
        Commands::Normalize { timestamps } => cmd_normalize(&config, &timestamps),
    }

    Ok(())
}
