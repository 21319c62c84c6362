use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result};

use crate::{RsiIndicator, SmaIndicator};

/// Indicator parameters (TOML).
///
/// Example `config/indicators.toml`:
/// ```toml
/// sma_period = 20
/// rsi_period = 14
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndicatorConfig {
    /// Lookback of the simple moving average.
    #[serde(default = "default_sma_period")]
    pub sma_period: usize,
    /// Wilder smoothing period of the RSI.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
}

fn default_sma_period() -> usize {
    SmaIndicator::DEFAULT_PERIOD
}

fn default_rsi_period() -> usize {
    RsiIndicator::DEFAULT_PERIOD
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_period: default_sma_period(),
            rsi_period: default_rsi_period(),
        }
    }
}

impl IndicatorConfig {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let cfg = Self::parse(&content)
            .map_err(|e| Error::Config(format!("indicator config at '{path}': {e}")))?;
        info!(path, sma = cfg.sma_period, rsi = cfg.rsi_period, "Loaded indicator config");
        Ok(cfg)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: IndicatorConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sma_period == 0 {
            return Err(Error::Config("sma_period must be >= 1".into()));
        }
        if self.rsi_period == 0 {
            return Err(Error::Config("rsi_period must be >= 1".into()));
        }
        Ok(())
    }
}
