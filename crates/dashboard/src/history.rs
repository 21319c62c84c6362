use std::collections::{HashMap, VecDeque};

use common::{Error, Instrument, PricePoint, Result};

/// Fixed-length price window per instrument.
///
/// Once seeded, a window always holds exactly `capacity` points: every
/// append evicts the oldest. Instruments that were never seeded have no
/// window at all.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    windows: HashMap<Instrument, VecDeque<PricePoint>>,
}

impl HistoryStore {
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Empty store whose windows hold `capacity` points. Zero is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("history capacity must be >= 1".into()));
        }
        Ok(Self {
            capacity,
            windows: HashMap::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_seeded(&self, instrument: Instrument) -> bool {
        self.windows.contains_key(&instrument)
    }

    /// Replace the whole window. Rejects anything but exactly `capacity` points.
    pub fn seed(&mut self, instrument: Instrument, points: Vec<PricePoint>) -> Result<()> {
        if points.len() != self.capacity {
            return Err(Error::SeedLength {
                instrument,
                expected: self.capacity,
                got: points.len(),
            });
        }
        self.windows.insert(instrument, points.into());
        Ok(())
    }

    /// Push `point` at the newest end and evict the oldest.
    pub fn append(&mut self, instrument: Instrument, point: PricePoint) -> Result<()> {
        let window = self
            .windows
            .get_mut(&instrument)
            .ok_or(Error::NotSeeded(instrument))?;
        window.pop_front();
        window.push_back(point);
        Ok(())
    }

    /// Ordered copy of the window, oldest first.
    pub fn snapshot(&self, instrument: Instrument) -> Option<Vec<PricePoint>> {
        self.windows
            .get(&instrument)
            .map(|w| w.iter().cloned().collect())
    }

    pub fn prices(&self, instrument: Instrument) -> Option<Vec<f64>> {
        self.windows
            .get(&instrument)
            .map(|w| w.iter().map(|p| p.price).collect())
    }

    pub fn latest(&self, instrument: Instrument) -> Option<&PricePoint> {
        self.windows.get(&instrument).and_then(|w| w.back())
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            windows: HashMap::new(),
        }
    }
}
