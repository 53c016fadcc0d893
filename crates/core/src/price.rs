//! Trade and snapshot data structures.

use crate::TradingPair;
use serde::{Deserialize, Serialize};

/// Length of the trailing average window.
pub const HOUR_MS: i64 = 3_600_000;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// A single normalized trade from the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub pair: TradingPair,
    pub price: f64,
    /// Exchange-reported trade time in milliseconds.
    pub timestamp_ms: i64,
}

impl Trade {
    /// Create a trade. Returns `None` unless `price` is positive and finite.
    pub fn new(pair: TradingPair, price: f64, timestamp_ms: i64) -> Option<Self> {
        if price.is_finite() && price > 0.0 {
            Some(Self {
                pair,
                price,
                timestamp_ms,
            })
        } else {
            None
        }
    }
}

/// One retained history sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub price: f64,
    pub timestamp_ms: i64,
}

/// Point-in-time view of a pair, as pushed to viewers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "symbol")]
    pub pair: TradingPair,
    pub price: f64,
    pub average: f64,
    /// Time the snapshot was read, not the time of the last trade.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trade_rejects_invalid_prices() {
        assert!(Trade::new(TradingPair::EthUsdc, 2500.0, 1).is_some());
        assert!(Trade::new(TradingPair::EthUsdc, 0.0, 1).is_none());
        assert!(Trade::new(TradingPair::EthUsdc, -1.0, 1).is_none());
        assert!(Trade::new(TradingPair::EthUsdc, f64::NAN, 1).is_none());
        assert!(Trade::new(TradingPair::EthUsdc, f64::INFINITY, 1).is_none());
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = Snapshot {
            pair: TradingPair::EthUsdt,
            price: 2501.5,
            average: 2500.25,
            timestamp_ms: 1_700_000_000_000,
        };

        let value = serde_json::to_value(snapshot).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "symbol": "ETH/USDT",
                "price": 2501.5,
                "average": 2500.25,
                "timestamp": 1_700_000_000_000i64,
            })
        );
    }

    #[test]
    fn test_now_ms_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_ms() > 1_577_836_800_000);
    }
}
