// =============================================================================
// Bars and Series: the canonical input of every calculator
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::types::Timeframe;

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Ordered bars for one timeframe.
///
/// Only constructible through [`Series::from_bars`] (or the validator), which
/// guarantees ascending, unique timestamps and finite prices.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl Series {
    /// Sort `bars` by timestamp and check the series invariants.
    pub fn from_bars(timeframe: Timeframe, mut bars: Vec<Bar>) -> Result<Self, IndicatorError> {
        for (i, bar) in bars.iter().enumerate() {
            let prices = [bar.open, bar.high, bar.low, bar.close];
            if prices.iter().any(|p| !p.is_finite()) {
                return Err(IndicatorError::malformed(format!(
                    "non-finite price in row {i} ({})",
                    bar.timestamp
                )));
            }
            if bar.volume.is_some_and(|v| !v.is_finite()) {
                return Err(IndicatorError::malformed(format!("non-finite volume in row {i}")));
            }
        }

        bars.sort_by_key(|b| b.timestamp);

        if let Some(dup) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(IndicatorError::malformed(format!(
                "duplicate timestamp {}",
                dup[0].timestamp
            )));
        }

        Ok(Self { timeframe, bars })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}
