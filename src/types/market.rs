//! Market quotes and stress alerts

use serde::{Deserialize, Serialize};

/// Asset class of a tracked symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stock,
    Crypto,
}

/// A tracked symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
}

impl Asset {
    pub fn stock(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: AssetKind::Stock,
        }
    }

    pub fn crypto(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: AssetKind::Crypto,
        }
    }
}

pub const SUPPORTED_STOCKS: [&str; 8] = ["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN", "META", "NVDA", "AMD"];
pub const SUPPORTED_CRYPTOS: [&str; 6] = ["BTC", "ETH", "XRP", "ADA", "SOL", "DOGE"];

/// Stocks first, then crypto
pub fn supported_assets() -> Vec<Asset> {
    SUPPORTED_STOCKS
        .iter()
        .map(|s| Asset::stock(s))
        .chain(SUPPORTED_CRYPTOS.iter().map(|c| Asset::crypto(c)))
        .collect()
}

/// One price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    /// Absolute change (stocks) or 24h percent change (crypto)
    pub change: f64,
    pub change_percent: f64,
    /// Share volume; crypto quotes carry none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    pub timestamp: String,
}

/// Payload of the `market_update` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub data: Quote,
    pub stress: f64,
    pub time: String,
}

/// Alert severity bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Moderate,
    High,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlertSeverity::Moderate => "MODERATE",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        };
        write!(f, "{}", name)
    }
}

/// Payload of the `stress_alert` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressAlert {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub level: f64,
    pub severity: AlertSeverity,
    pub message: String,
    pub description: String,
    pub requires_approval: bool,
    pub escalated: bool,
    pub timestamp: String,
}
