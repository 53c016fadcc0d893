//! Finnhub WebSocket adapter.
//!
//! Finnhub multiplexes every subscription over one socket. Outbound frames
//! are `{"type":"subscribe","symbol":..}`; inbound trade frames carry a batch
//! of records keyed by the upstream symbol. This module normalizes those
//! records into [`Trade`] values and builds the subscription frames.

use serde::{Deserialize, Serialize};
use ticker_core::{Trade, TradingPair};
use tracing::warn;

use crate::{FeedError, WsMessage};

/// Finnhub WebSocket adapter.
pub struct FinnhubAdapter;

/// Inbound frame from Finnhub.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum FinnhubMessage {
    Trade {
        #[serde(default)]
        data: Vec<FinnhubTrade>,
    },
    Error {
        #[serde(default)]
        msg: String,
    },
    /// `ping` and anything else we do not consume.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct FinnhubTrade {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: f64,
    #[serde(rename = "t")]
    timestamp_ms: i64,
    #[allow(dead_code)]
    #[serde(rename = "v", default)]
    volume: f64,
}

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    symbol: &'a str,
}

impl FinnhubAdapter {
    /// One subscribe frame per tracked pair, in pair order.
    pub fn subscribe_messages() -> Vec<String> {
        TradingPair::ALL
            .iter()
            .map(|pair| Self::subscribe_message(pair.upstream_symbol()))
            .collect()
    }

    fn subscribe_message(symbol: &str) -> String {
        // Serializing a struct of two string fields cannot fail.
        serde_json::to_string(&SubscribeRequest {
            kind: "subscribe",
            symbol,
        })
        .unwrap_or_default()
    }

    /// Extract the UTF-8 payload of a data frame.
    ///
    /// Returns `None` for lifecycle messages that carry no payload.
    pub fn decode_frame(msg: &WsMessage) -> Option<Result<&str, FeedError>> {
        match msg {
            WsMessage::Text(text) => Some(Ok(text.as_str())),
            WsMessage::Binary(data) => Some(std::str::from_utf8(data).map_err(FeedError::from)),
            _ => None,
        }
    }

    /// Parse a Finnhub frame into normalized trades.
    ///
    /// Frames other than `trade` yield no trades. Records for symbols outside
    /// the pair table are skipped silently; records with a non-positive price
    /// are skipped with a warning.
    pub fn parse_trades(json: &str) -> Result<Vec<Trade>, FeedError> {
        let message: FinnhubMessage = serde_json::from_str(json)?;

        let records = match message {
            FinnhubMessage::Trade { data } => data,
            FinnhubMessage::Error { msg } => {
                warn!("Finnhub: server reported error: {}", msg);
                return Ok(Vec::new());
            }
            FinnhubMessage::Other => return Ok(Vec::new()),
        };

        let trades = records
            .into_iter()
            .filter_map(|record| {
                let pair = TradingPair::from_upstream_symbol(&record.symbol)?;
                let trade = Trade::new(pair, record.price, record.timestamp_ms);
                if trade.is_none() {
                    warn!(
                        "Finnhub: dropping {} trade with invalid price {}",
                        pair, record.price
                    );
                }
                trade
            })
            .collect();

        Ok(trades)
    }
}
