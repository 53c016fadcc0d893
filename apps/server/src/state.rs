//! Application state management.

use crate::config::AppConfig;
use crate::scheduler::{BroadcastScheduler, ClientId};
use crate::ws_server::BroadcastSender;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use ticker_feeds::PriceAggregator;
use tokio::sync::broadcast;

/// State shared by the feed task and every client connection.
pub struct AppState {
    /// Per-pair prices, written by the feed.
    pub aggregator: Arc<PriceAggregator>,
    /// Shared broadcast timer.
    pub scheduler: BroadcastScheduler,
    /// Fan-out channel for tick events.
    pub broadcast_tx: BroadcastSender,
    next_client_id: AtomicU64,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let aggregator = Arc::new(PriceAggregator::new());
        let (broadcast_tx, _) = broadcast::channel(config.server.broadcast_capacity);
        let scheduler = BroadcastScheduler::new(
            Arc::clone(&aggregator),
            broadcast_tx.clone(),
            config.server.broadcast_interval(),
        );

        Self {
            aggregator,
            scheduler,
            broadcast_tx,
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Allocate an identifier for a new connection.
    pub fn next_client_id(&self) -> ClientId {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Thread-safe shared state.
pub type SharedState = Arc<AppState>;

/// Create shared state.
pub fn create_state(config: &AppConfig) -> SharedState {
    Arc::new(AppState::new(config))
}
