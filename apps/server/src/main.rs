//! Crypto Ticker - Headless Server
//!
//! Streams ETH/USDC, ETH/USDT and ETH/BTC trades from Finnhub and pushes the
//! current price and hourly average to WebSocket clients once per second.

mod config;
mod error;
mod scheduler;
mod state;
mod ws_server;

use clap::Parser;
use config::AppConfig;
use error::ServerError;
use state::create_state;
use std::process::ExitCode;
use std::time::Duration;
use ticker_feeds::{FeedConfig, TradeFeed, API_KEY_ENV, FINNHUB_WS_URL};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Crypto Ticker CLI
#[derive(Parser, Debug)]
#[command(name = "crypto-ticker")]
#[command(about = "Real-time ETH pair price ticker", long_about = None)]
struct Args {
    /// Finnhub API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Upstream WebSocket URL
    #[arg(long, env = "FINNHUB_WS_URL", default_value = FINNHUB_WS_URL)]
    feed_url: String,

    /// HTTP/WebSocket server port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> AppConfig {
        let mut config = AppConfig::default();
        config.feed.ws_url = self.feed_url;
        config.feed.api_key = self.api_key;
        config.server.port = self.port;
        config.log_level = self.log_level;
        config
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_logging(level: &str) -> Result<(), ServerError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ServerError::Logging(e.to_string()))
}

async fn run(config: AppConfig) -> Result<(), ServerError> {
    info!("🚀 Crypto Ticker starting...");
    info!("  Feed: {}", config.feed.ws_url);
    info!("  Port: {}", config.server.port);
    info!("  Broadcast interval: {}ms", config.server.broadcast_interval_ms);

    let state = create_state(&config);

    ws_server::start_ws_server(state.clone(), config.server.bind_addr()).await?;

    let cancel = CancellationToken::new();
    let feed = TradeFeed::new(FeedConfig::from(&config.feed), state.aggregator.clone());
    let feed_cancel = cancel.clone();
    let feed_handle = tokio::spawn(async move {
        match feed.run(feed_cancel).await {
            Ok(stats) => info!(
                "📈 Feed totals: {} messages, {} trades, {} errors",
                stats.messages, stats.trades, stats.errors
            ),
            Err(e) => error!("Trade feed failed: {}", e),
        }
    });

    info!("Press Ctrl+C to stop...");

    tokio::signal::ctrl_c().await.map_err(ServerError::Signal)?;

    warn!("Shutdown signal received");
    cancel.cancel();
    let subscribers = state.scheduler.subscriber_count();
    if state.scheduler.stop() {
        info!("Stopped broadcasting to {} clients", subscribers);
    }

    if tokio::time::timeout(Duration::from_secs(2), feed_handle)
        .await
        .is_err()
    {
        warn!("Trade feed did not stop within the grace period");
    }

    info!("👋 Crypto Ticker stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(args.into_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::try_parse_from([
            "crypto-ticker",
            "--api-key",
            "test_api_key",
            "--feed-url",
            "ws://127.0.0.1:9000",
            "--port",
            "8080",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let config = args.into_config();
        assert_eq!(config.feed.api_key.as_deref(), Some("test_api_key"));
        assert_eq!(config.feed.ws_url, "ws://127.0.0.1:9000");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server.broadcast_interval_ms, 1000);
        assert_eq!(config.feed.reconnect_delay_ms, 5000);
    }

    #[test]
    fn test_args_reject_invalid_port() {
        let result = Args::try_parse_from(["crypto-ticker", "--port", "not-a-port"]);
        assert!(result.is_err());
    }
}
