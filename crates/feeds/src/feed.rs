//! Trade feed that connects to Finnhub and updates the aggregator.

use crate::{FeedConfig, FeedError, FinnhubAdapter, PriceAggregator, WsClient, WsMessage, API_KEY_ENV};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counters for a feed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Data frames received.
    pub messages: u64,
    /// Trades applied to the aggregator.
    pub trades: u64,
    /// Frames that failed to decode or parse.
    pub errors: u64,
}

/// Data frames between progress log lines.
const PROGRESS_INTERVAL: u64 = 1000;

impl FeedStats {
    /// True on every `PROGRESS_INTERVAL`th data frame.
    pub fn at_checkpoint(&self) -> bool {
        self.messages > 0 && self.messages % PROGRESS_INTERVAL == 0
    }
}

/// Trade feed for the tracked pairs.
pub struct TradeFeed {
    config: FeedConfig,
    aggregator: Arc<PriceAggregator>,
}

impl TradeFeed {
    /// Create a new trade feed.
    pub fn new(config: FeedConfig, aggregator: Arc<PriceAggregator>) -> Self {
        Self { config, aggregator }
    }

    /// Connect and process trades until `cancel` fires.
    ///
    /// Without a credential this logs once and returns immediately; no
    /// connection is attempted and nothing is retried.
    pub async fn run(self, cancel: CancellationToken) -> Result<FeedStats, FeedError> {
        if self.config.credential().is_none() {
            error!("{} is not defined in environment variables", API_KEY_ENV);
            return Ok(FeedStats::default());
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let client = WsClient::new(self.config.clone(), tx, cancel);
        let client_handle = tokio::spawn(client.run(FinnhubAdapter::subscribe_messages()));

        // Ends once the client exits and drops its sender.
        let stats = self.process(rx).await;

        client_handle
            .await
            .map_err(|e| FeedError::TaskFailed(e.to_string()))??;

        Ok(stats)
    }

    /// Drain messages from the WebSocket client in arrival order.
    pub async fn process(&self, mut rx: mpsc::Receiver<WsMessage>) -> FeedStats {
        info!("Starting trade feed");
        let mut stats = FeedStats::default();

        while let Some(msg) = rx.recv().await {
            let is_data = matches!(msg, WsMessage::Text(_) | WsMessage::Binary(_));
            if is_data {
                stats.messages += 1;
            }

            match self.handle_message(&msg) {
                Ok(applied) => stats.trades += applied as u64,
                Err(e) => {
                    stats.errors += 1;
                    error!("Error parsing WebSocket message: {}", e);
                }
            }

            if is_data && stats.at_checkpoint() {
                debug!(
                    "Processed {} messages ({} trades, {} errors)",
                    stats.messages, stats.trades, stats.errors
                );
            }
        }

        info!(
            "Trade feed stopped. Total messages: {}, trades: {}, errors: {}",
            stats.messages, stats.trades, stats.errors
        );
        stats
    }

    /// Apply a single client message, returning the number of trades recorded.
    ///
    /// Lifecycle events are already logged by the client and apply nothing.
    pub fn handle_message(&self, msg: &WsMessage) -> Result<usize, FeedError> {
        let Some(payload) = FinnhubAdapter::decode_frame(msg) else {
            return Ok(0);
        };

        let trades = FinnhubAdapter::parse_trades(payload?)?;
        for trade in &trades {
            self.aggregator.apply(trade);
        }
        Ok(trades.len())
    }

    /// Shared aggregator handle.
    pub fn aggregator(&self) -> &Arc<PriceAggregator> {
        &self.aggregator
    }
}
