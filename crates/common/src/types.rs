use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tradable pair tracked by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Instrument {
    #[serde(rename = "BTC-USD")]
    BtcUsd,
    #[serde(rename = "ETH-USD")]
    EthUsd,
}

impl Instrument {
    /// Every tracked instrument, in display order.
    pub const ALL: [Instrument; 2] = [Instrument::BtcUsd, Instrument::EthUsd];

    /// Lowercase symbol used by the exchange feed (e.g. `btcusdt`).
    pub fn wire_symbol(self) -> &'static str {
        match self {
            Instrument::BtcUsd => "btcusdt",
            Instrument::EthUsd => "ethusdt",
        }
    }

    /// Reverse lookup from a feed symbol. Case-insensitive; `None` for
    /// symbols outside the tracked set.
    pub fn from_wire_symbol(symbol: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.wire_symbol().eq_ignore_ascii_case(symbol))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::BtcUsd => "BTC-USD",
            Instrument::EthUsd => "ETH-USD",
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Instrument {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::Other(format!("unknown instrument '{s}'")))
    }
}

/// One entry of a rolling price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Time of day, `HH:MM`.
    #[serde(rename = "time")]
    pub label: String,
    pub price: f64,
}

impl PricePoint {
    pub fn new(label: impl Into<String>, price: f64) -> Self {
        Self {
            label: label.into(),
            price,
        }
    }
}

/// Live trade price for one instrument, as delivered by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub instrument: Instrument,
    pub price: f64,
}

/// Indicator values derived from a history snapshot.
/// A field is `None` while the history is too short to compute it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub moving_average: Option<f64>,
    pub rsi: Option<f64>,
}

/// Lifecycle of the single feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closing => write!(f, "closing"),
        }
    }
}

/// Recommended action returned by the advisory model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Structured recommendation from the advisory model. Passed through as-is;
/// numeric ranges are not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub strategy_name: String,
    pub action: Action,
    /// 0-100 as reported by the model.
    pub confidence: f64,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub reasoning: String,
}

/// Everything the advisory model is given for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    pub instrument: Instrument,
    pub current_price: f64,
    pub recent_prices: Vec<PricePoint>,
    pub indicators: IndicatorSnapshot,
}

/// A recommendation as kept in the dashboard's strategy log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedRecommendation {
    pub id: uuid::Uuid,
    pub instrument: Instrument,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

impl LoggedRecommendation {
    pub fn new(instrument: Instrument, recommendation: Recommendation) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            instrument,
            created_at: Utc::now(),
            recommendation,
        }
    }
}
