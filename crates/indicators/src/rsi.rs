use crate::round2;

/// RSI (Relative Strength Index) indicator.
///
/// Uses Wilder's smoothed moving average (same as TradingView / standard RSI).
/// Returns `None` until at least `period + 1` price values are available.
#[derive(Debug, Clone, Copy)]
pub struct RsiIndicator {
    pub period: usize,
}

impl RsiIndicator {
    pub const DEFAULT_PERIOD: usize = 14;

    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }

    /// Compute RSI from a slice of prices (oldest first), replaying the
    /// smoothing recurrence over every change in the slice.
    /// Returns `None` if there are fewer than `period + 1` values.
    pub fn compute(&self, prices: &[f64]) -> Option<f64> {
        if prices.len() < self.period + 1 {
            return None;
        }

        // First average gain/loss over the initial `period` changes
        let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let initial = &changes[..self.period];

        let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / self.period as f64;
        let mut avg_loss = initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>()
            / self.period as f64;

        // Wilder smoothing over remaining changes
        for &change in &changes[self.period..] {
            avg_gain = smooth(avg_gain, change.max(0.0), self.period);
            avg_loss = smooth(avg_loss, (-change).max(0.0), self.period);
        }

        Some(rsi_from_averages(avg_gain, avg_loss))
    }
}

/// Wilder RSI carried forward one price at a time.
///
/// Holds the unrounded running averages, so pushing prices one by one yields
/// the same value as `RsiIndicator::compute` over the whole series. The
/// dashboard recomputes over its current window instead; this type is the
/// reference the incremental-replay tests check `compute` against.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    avg_gain: f64,
    avg_loss: f64,
    last_price: f64,
}

impl WilderRsi {
    /// Seed from the first `period + 1` prices of `prices`.
    /// Returns `None` if fewer are given.
    pub fn seed(period: usize, prices: &[f64]) -> Option<Self> {
        if period == 0 || prices.len() < period + 1 {
            return None;
        }
        let window = &prices[..=period];
        let (gains, losses) = window.windows(2).fold((0.0, 0.0), |(g, l), w| {
            let change = w[1] - w[0];
            (g + change.max(0.0), l + (-change).max(0.0))
        });
        Some(Self {
            period,
            avg_gain: gains / period as f64,
            avg_loss: losses / period as f64,
            last_price: window[period],
        })
    }

    /// Fold one more price into the running averages.
    pub fn push(&mut self, price: f64) {
        let change = price - self.last_price;
        self.avg_gain = smooth(self.avg_gain, change.max(0.0), self.period);
        self.avg_loss = smooth(self.avg_loss, (-change).max(0.0), self.period);
        self.last_price = price;
    }

    pub fn avg_gain(&self) -> f64 {
        self.avg_gain
    }

    pub fn avg_loss(&self) -> f64 {
        self.avg_loss
    }

    /// Current RSI, rounded to two decimals.
    pub fn value(&self) -> f64 {
        rsi_from_averages(self.avg_gain, self.avg_loss)
    }
}

fn smooth(prev: f64, current: f64, period: usize) -> f64 {
    (prev * (period - 1) as f64 + current) / period as f64
}

/// No measured losses (including a perfectly flat series) reads as 100.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    round2(100.0 - 100.0 / (1.0 + rs))
}
