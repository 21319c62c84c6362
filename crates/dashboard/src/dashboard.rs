use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use common::{
    AdvisoryRequest, ConnectionState, IndicatorSnapshot, Instrument, LoggedRecommendation,
    PricePoint, PriceUpdate, Recommendation, Result,
};
use indicators::IndicatorConfig;

use crate::history::HistoryStore;
use crate::seed::SeedSource;

/// Number of history points handed to the advisory model.
pub const ADVISORY_LOOKBACK: usize = 10;

/// Recommendations kept in the strategy log, newest first.
pub const STRATEGY_LOG_CAPACITY: usize = 20;

/// Dashboard state: which instrument is on screen, the latest live price
/// per instrument, the rolling history windows and the strategy log.
///
/// Indicators are derived from the selected window on every read.
pub struct Dashboard {
    selected: Instrument,
    live_prices: HashMap<Instrument, f64>,
    history: HistoryStore,
    seeds: Arc<dyn SeedSource>,
    indicator_cfg: IndicatorConfig,
    strategy_log: VecDeque<LoggedRecommendation>,
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub selected: Instrument,
    pub current_price: f64,
    pub live_prices: BTreeMap<Instrument, f64>,
    pub history: Vec<PricePoint>,
    pub indicators: IndicatorSnapshot,
    pub connection: ConnectionState,
}

impl Dashboard {
    /// Build the dashboard with `selected` on screen and its history seeded.
    pub fn new(
        selected: Instrument,
        capacity: usize,
        seeds: Arc<dyn SeedSource>,
        indicator_cfg: IndicatorConfig,
    ) -> Result<Self> {
        indicator_cfg.validate()?;
        let mut dashboard = Self {
            selected,
            live_prices: HashMap::new(),
            history: HistoryStore::new(capacity)?,
            seeds,
            indicator_cfg,
            strategy_log: VecDeque::with_capacity(STRATEGY_LOG_CAPACITY),
        };
        dashboard.select(selected)?;
        Ok(dashboard)
    }

    pub fn selected(&self) -> Instrument {
        self.selected
    }

    /// Switch the displayed instrument, seeding its window on first use.
    /// The displayed price jumps to the newest point of that window.
    pub fn select(&mut self, instrument: Instrument) -> Result<()> {
        if !self.history.is_seeded(instrument) {
            let points = self.seeds.seed(instrument);
            self.history.seed(instrument, points)?;
            info!(%instrument, capacity = self.history.capacity(), "Seeded price history");
        }
        if let Some(latest) = self.history.latest(instrument) {
            self.live_prices.insert(instrument, latest.price);
        }
        self.selected = instrument;
        Ok(())
    }

    /// Fold a live update in, labelling any new history point with the current time.
    pub fn apply_update(&mut self, update: PriceUpdate) -> Result<()> {
        self.apply_update_at(update, Utc::now())
    }

    /// Record the live price; extend history only for the selected instrument.
    pub fn apply_update_at(&mut self, update: PriceUpdate, at: DateTime<Utc>) -> Result<()> {
        self.live_prices.insert(update.instrument, update.price);
        if update.instrument != self.selected {
            return Ok(());
        }
        let point = PricePoint::new(at.format("%H:%M").to_string(), update.price);
        self.history.append(update.instrument, point)?;
        debug!(instrument = %update.instrument, price = update.price, "History advanced");
        Ok(())
    }

    pub fn live_price(&self, instrument: Instrument) -> Option<f64> {
        self.live_prices.get(&instrument).copied()
    }

    /// Live price of the selected instrument, falling back to the newest
    /// history point, then zero.
    pub fn current_price(&self) -> f64 {
        self.live_price(self.selected)
            .or_else(|| self.history.latest(self.selected).map(|p| p.price))
            .unwrap_or(0.0)
    }

    /// Window of the selected instrument, oldest first.
    pub fn history(&self) -> Vec<PricePoint> {
        self.history.snapshot(self.selected).unwrap_or_default()
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    pub fn indicators(&self) -> IndicatorSnapshot {
        let prices = self.history.prices(self.selected).unwrap_or_default();
        indicators::snapshot(&prices, &self.indicator_cfg)
    }

    /// Input for the advisory model: current price, the last few history
    /// points and the indicator values.
    pub fn advisory_request(&self) -> AdvisoryRequest {
        let history = self.history();
        let start = history.len().saturating_sub(ADVISORY_LOOKBACK);
        AdvisoryRequest {
            instrument: self.selected,
            current_price: self.current_price(),
            recent_prices: history[start..].to_vec(),
            indicators: self.indicators(),
        }
    }

    pub fn record_recommendation(
        &mut self,
        instrument: Instrument,
        recommendation: Recommendation,
    ) -> LoggedRecommendation {
        let entry = LoggedRecommendation::new(instrument, recommendation);
        if self.strategy_log.len() == STRATEGY_LOG_CAPACITY {
            self.strategy_log.pop_back();
        }
        self.strategy_log.push_front(entry.clone());
        entry
    }

    /// Logged recommendations, newest first.
    pub fn strategy_log(&self) -> Vec<LoggedRecommendation> {
        self.strategy_log.iter().cloned().collect()
    }

    pub fn view(&self, connection: ConnectionState) -> DashboardView {
        DashboardView {
            selected: self.selected,
            current_price: self.current_price(),
            live_prices: self.live_prices.iter().map(|(i, p)| (*i, *p)).collect(),
            history: self.history(),
            indicators: self.indicators(),
            connection,
        }
    }
}
