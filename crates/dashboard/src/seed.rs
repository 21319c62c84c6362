use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use common::{Instrument, PricePoint};
use indicators::round2;

/// Provides the initial history window for an instrument.
pub trait SeedSource: Send + Sync {
    /// Ordered points, oldest first. The history store rejects the result
    /// unless it has exactly the store's capacity.
    fn seed(&self, instrument: Instrument) -> Vec<PricePoint>;
}

/// Random-walk backfill, generated once so re-selecting an instrument
/// shows the same chart.
#[derive(Debug, Clone)]
pub struct SyntheticSeed {
    windows: HashMap<Instrument, Vec<PricePoint>>,
}

impl SyntheticSeed {
    pub fn generate(points: usize) -> Self {
        Self::generate_with(points, Utc::now(), &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(points: usize, now: DateTime<Utc>, rng: &mut R) -> Self {
        let windows = Instrument::ALL
            .into_iter()
            .map(|i| (i, random_walk(i, points, now, rng)))
            .collect();
        Self { windows }
    }
}

impl SeedSource for SyntheticSeed {
    fn seed(&self, instrument: Instrument) -> Vec<PricePoint> {
        self.windows.get(&instrument).cloned().unwrap_or_default()
    }
}

fn walk_params(instrument: Instrument) -> (f64, f64) {
    match instrument {
        Instrument::BtcUsd => (68_000.0, 0.025),
        Instrument::EthUsd => (3_800.0, 0.035),
    }
}

/// Hourly points ending just before `now`, with a slowly drifting trend.
fn random_walk<R: Rng>(
    instrument: Instrument,
    points: usize,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<PricePoint> {
    const MAX_TREND: f64 = 0.05;

    let (mut price, volatility) = walk_params(instrument);
    let mut trend = (rng.gen::<f64>() - 0.5) * 0.1;
    let mut out = Vec::with_capacity(points);

    for hours_back in (1..=points as i64).rev() {
        let time = now - Duration::hours(hours_back);
        let noise = (rng.gen::<f64>() - 0.5) * 2.0;
        price = (price * (1.0 + trend + noise * volatility)).max(0.0);
        trend = (trend + (rng.gen::<f64>() - 0.5) * 0.01).clamp(-MAX_TREND, MAX_TREND);

        out.push(PricePoint::new(time.format("%H:%M").to_string(), round2(price)));
    }

    debug!(%instrument, points, last = ?out.last().map(|p| p.price), "Generated synthetic seed");
    out
}
