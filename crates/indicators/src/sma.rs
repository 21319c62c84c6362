use crate::round2;

/// Simple moving average over the trailing `period` prices.
#[derive(Debug, Clone, Copy)]
pub struct SmaIndicator {
    pub period: usize,
}

impl SmaIndicator {
    pub const DEFAULT_PERIOD: usize = 20;

    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    /// Mean of the last `period` prices (oldest first), rounded to cents.
    /// Returns `None` if there are fewer than `period` values.
    pub fn compute(&self, prices: &[f64]) -> Option<f64> {
        if prices.len() < self.period {
            return None;
        }
        let window = &prices[prices.len() - self.period..];
        Some(round2(window.iter().sum::<f64>() / self.period as f64))
    }
}
