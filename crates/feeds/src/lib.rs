//! Real-time trade feed for the tracked ETH pairs.
//!
//! This crate keeps one WebSocket connection to Finnhub alive and folds the
//! trades it delivers into a shared [`PriceAggregator`].
//!
//! ## Architecture
//!
//! - `websocket` - Reconnecting client that forwards frames over a channel
//! - `adapter` - Finnhub subscribe frames and trade parsing
//! - `feed` - Consumes client messages and updates the aggregator
//! - `aggregator` - Per-pair current price and one-hour average

pub mod adapter;
pub mod aggregator;
pub mod error;
pub mod feed;
pub mod manager;
pub mod websocket;

pub use adapter::FinnhubAdapter;
pub use aggregator::*;
pub use error::*;
pub use feed::*;
pub use manager::*;
pub use websocket::*;
