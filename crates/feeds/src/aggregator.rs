//! Price aggregator for the tracked pairs.
//!
//! Keeps the latest trade price and a one-hour trade history per pair in a
//! fixed table indexed by [`TradingPair::index`]. History is pruned only when
//! a new trade for that pair arrives: a pair that goes quiet for more than an
//! hour keeps reporting its last average until the next trade.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use ticker_core::{now_ms, PricePoint, Snapshot, Trade, TradingPair, HOUR_MS};

/// Per-pair state.
#[derive(Debug, Default)]
struct PriceState {
    current_price: f64,
    history: VecDeque<PricePoint>,
}

impl PriceState {
    fn record(&mut self, price: f64, timestamp_ms: i64, now_ms: i64) {
        self.current_price = price;
        self.history.push_back(PricePoint {
            price,
            timestamp_ms,
        });

        // Trades can arrive with old timestamps, so filter the whole window
        // instead of popping from the front.
        let cutoff = now_ms - HOUR_MS;
        self.history.retain(|point| point.timestamp_ms > cutoff);
    }

    fn average(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.history.iter().map(|point| point.price).sum();
        sum / self.history.len() as f64
    }
}

/// Thread-safe price aggregator for the tracked pairs.
#[derive(Debug, Default)]
pub struct PriceAggregator {
    slots: [Mutex<PriceState>; TradingPair::COUNT],
}

impl PriceAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, pair: TradingPair) -> MutexGuard<'_, PriceState> {
        // Writers never panic mid-update.
        self.slots[pair.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a trade, pruning history against the current wall clock.
    pub fn handle_trade(&self, pair: TradingPair, price: f64, timestamp_ms: i64) {
        self.handle_trade_at(pair, price, timestamp_ms, now_ms());
    }

    /// Record a trade, pruning history against an explicit `now_ms`.
    pub fn handle_trade_at(&self, pair: TradingPair, price: f64, timestamp_ms: i64, now_ms: i64) {
        self.slot(pair).record(price, timestamp_ms, now_ms);
    }

    /// Record a normalized trade.
    pub fn apply(&self, trade: &Trade) {
        self.handle_trade(trade.pair, trade.price, trade.timestamp_ms);
    }

    /// Latest trade price, or 0 if the pair has never traded.
    pub fn current_price(&self, pair: TradingPair) -> f64 {
        self.slot(pair).current_price
    }

    /// Unweighted mean of retained trade prices, or 0 if none are retained.
    pub fn hourly_average(&self, pair: TradingPair) -> f64 {
        self.slot(pair).average()
    }

    /// Number of retained history samples.
    pub fn history_len(&self, pair: TradingPair) -> usize {
        self.slot(pair).history.len()
    }

    /// Snapshot of a single pair, stamped with the read time.
    pub fn snapshot(&self, pair: TradingPair) -> Snapshot {
        let state = self.slot(pair);
        Snapshot {
            pair,
            price: state.current_price,
            average: state.average(),
            timestamp_ms: now_ms(),
        }
    }

    /// Snapshots of every tracked pair in declaration order.
    pub fn all_data(&self) -> [Snapshot; TradingPair::COUNT] {
        TradingPair::ALL.map(|pair| self.snapshot(pair))
    }
}
