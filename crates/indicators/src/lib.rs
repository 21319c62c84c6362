//! Technical indicators over an ordered price series (oldest first).
//!
//! All arithmetic is `f64`. Rounding to cents happens only on returned
//! values; running averages stay unrounded.

pub mod config;
pub mod rsi;
pub mod sma;

pub use config::IndicatorConfig;
pub use rsi::{RsiIndicator, WilderRsi};
pub use sma::SmaIndicator;

use common::{IndicatorSnapshot, PricePoint};

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute every configured indicator over `prices`.
pub fn snapshot(prices: &[f64], cfg: &IndicatorConfig) -> IndicatorSnapshot {
    IndicatorSnapshot {
        moving_average: SmaIndicator::new(cfg.sma_period).compute(prices),
        rsi: RsiIndicator::new(cfg.rsi_period).compute(prices),
    }
}

/// Same as [`snapshot`], reading the prices out of a history window.
pub fn snapshot_points(points: &[PricePoint], cfg: &IndicatorConfig) -> IndicatorSnapshot {
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    snapshot(&prices, cfg)
}
