//! Trading pair identifiers and the upstream symbol table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracked trading pair.
///
/// The set is closed: every pair the service knows about is a variant here,
/// and its position in [`TradingPair::ALL`] doubles as a dense slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TradingPair {
    #[serde(rename = "ETH/USDC")]
    EthUsdc = 0,
    #[serde(rename = "ETH/USDT")]
    EthUsdt = 1,
    #[serde(rename = "ETH/BTC")]
    EthBtc = 2,
}

impl TradingPair {
    /// Number of tracked pairs.
    pub const COUNT: usize = 3;

    /// All pairs in declaration order.
    pub const ALL: [TradingPair; Self::COUNT] =
        [TradingPair::EthUsdc, TradingPair::EthUsdt, TradingPair::EthBtc];

    /// Dense index in `0..COUNT`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name (e.g., "ETH/USDC").
    pub fn display(self) -> &'static str {
        match self {
            TradingPair::EthUsdc => "ETH/USDC",
            TradingPair::EthUsdt => "ETH/USDT",
            TradingPair::EthBtc => "ETH/BTC",
        }
    }

    /// Symbol used by the upstream feed (e.g., "BINANCE:ETHUSDC").
    pub fn upstream_symbol(self) -> &'static str {
        match self {
            TradingPair::EthUsdc => "BINANCE:ETHUSDC",
            TradingPair::EthUsdt => "BINANCE:ETHUSDT",
            TradingPair::EthBtc => "BINANCE:ETHBTC",
        }
    }

    /// Look up a pair by its upstream symbol. Exact, case-sensitive match.
    pub fn from_upstream_symbol(symbol: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pair| pair.upstream_symbol() == symbol)
    }

}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pair_indices_are_dense() {
        for (i, pair) in TradingPair::ALL.iter().enumerate() {
            assert_eq!(pair.index(), i);
        }
    }

    #[test]
    fn test_upstream_symbol_lookup() {
        assert_eq!(
            TradingPair::from_upstream_symbol("BINANCE:ETHUSDC"),
            Some(TradingPair::EthUsdc)
        );
        assert_eq!(
            TradingPair::from_upstream_symbol("BINANCE:ETHUSDT"),
            Some(TradingPair::EthUsdt)
        );
        assert_eq!(
            TradingPair::from_upstream_symbol("BINANCE:ETHBTC"),
            Some(TradingPair::EthBtc)
        );
        assert_eq!(TradingPair::from_upstream_symbol("BINANCE:BTCUSDT"), None);
        assert_eq!(TradingPair::from_upstream_symbol("binance:ethusdc"), None);
    }

    #[test]
    fn test_display_matches_to_string() {
        let names: Vec<_> = TradingPair::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["ETH/USDC", "ETH/USDT", "ETH/BTC"]);
    }

    #[test]
    fn test_pair_serializes_as_display_name() {
        let json = serde_json::to_string(&TradingPair::EthBtc).unwrap();
        assert_eq!(json, "\"ETH/BTC\"");
    }
}
