// =============================================================================
// Indicator results: the per-indicator record handed back to callers
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicators::adx::TrendStrength;
use crate::indicators::atr::VolatilityState;
use crate::indicators::bollinger::{BandPosition, BandWalk};
use crate::indicators::moving_average::{MaPair, MaType, PricePosition, Slope, TrendAlignment, TrendPosition};
use crate::indicators::rsi::RsiLevels;
use crate::signals::cross::CrossEvent;
use crate::signals::divergence::DivergenceEvent;
use crate::indicators::macd::ZeroLinePosition;
use crate::types::Timeframe;

/// Name under which an indicator appears in a timeframe bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IndicatorKind {
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "RSI_LONG")]
    RsiLong,
    #[serde(rename = "RSI_MEDIUM")]
    RsiMedium,
    #[serde(rename = "RSI_SHORT")]
    RsiShort,
    #[serde(rename = "MACD")]
    Macd,
    BollingerBands,
    MovingAverages,
    MovingAverage,
    #[serde(rename = "ATR")]
    Atr,
    #[serde(rename = "ADX")]
    Adx,
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsi => write!(f, "RSI"),
            Self::RsiLong => write!(f, "RSI_LONG"),
            Self::RsiMedium => write!(f, "RSI_MEDIUM"),
            Self::RsiShort => write!(f, "RSI_SHORT"),
            Self::Macd => write!(f, "MACD"),
            Self::BollingerBands => write!(f, "BollingerBands"),
            Self::MovingAverages => write!(f, "MovingAverages"),
            Self::MovingAverage => write!(f, "MovingAverage"),
            Self::Atr => write!(f, "ATR"),
            Self::Adx => write!(f, "ADX"),
        }
    }
}

/// Output of one calculator invocation.  Produced fresh on every call and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorResult {
    pub indicator: IndicatorKind,
    pub timeframe: Timeframe,
    /// Human-readable parameter string, e.g. `"12,26,9"` or `"BB(20,2)"`.
    pub parameters: String,
    pub current_value: Option<f64>,
    pub previous_value: Option<f64>,
    pub derived_state: &'static str,
    pub derived_signal: &'static str,
    pub sample_count: usize,
    pub computed_at: DateTime<Utc>,
    pub details: IndicatorDetails,
}

/// Indicator-specific fields, typed per calculator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorDetails {
    Rsi {
        period: usize,
        levels: RsiLevels,
        divergence: DivergenceEvent,
    },
    Macd {
        macd_line: Option<f64>,
        signal_line: Option<f64>,
        histogram: Option<f64>,
        cross: CrossEvent,
        zero_line: ZeroLinePosition,
    },
    Bollinger {
        price: f64,
        upper: Option<f64>,
        middle: Option<f64>,
        lower: Option<f64>,
        position: BandPosition,
        band_walk: BandWalk,
        band_width_pct: Option<f64>,
    },
    MovingAverage {
        period: usize,
        ma_type: MaType,
        price: f64,
        position: PricePosition,
        slope: Slope,
    },
    TripleMovingAverage {
        price: f64,
        short: Option<f64>,
        medium: Option<f64>,
        long: Option<f64>,
        position: TrendPosition,
        slopes: BTreeMap<usize, Slope>,
        trend_alignment: TrendAlignment,
        crosses: BTreeMap<MaPair, CrossEvent>,
        support_resistance: BTreeMap<usize, f64>,
    },
    Atr {
        period: usize,
        state: VolatilityState,
    },
    Adx {
        period: usize,
        state: TrendStrength,
    },
}

/// An indicator slot in a timeframe bundle: either a computed result or the
/// captured failure.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorOutcome {
    Computed(IndicatorResult),
    Failed {
        indicator: IndicatorKind,
        timeframe: Timeframe,
        error: IndicatorError,
        #[serde(skip_serializing_if = "Option::is_none")]
        recommendation: Option<String>,
    },
}

impl IndicatorOutcome {
    pub fn from_result(
        indicator: IndicatorKind,
        timeframe: Timeframe,
        result: Result<IndicatorResult, IndicatorError>,
    ) -> Self {
        match result {
            Ok(r) => Self::Computed(r),
            Err(error) => Self::Failed {
                indicator,
                timeframe,
                error,
                recommendation: None,
            },
        }
    }

    pub fn result(&self) -> Option<&IndicatorResult> {
        match self {
            Self::Computed(r) => Some(r),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&IndicatorError> {
        match self {
            Self::Computed(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Round `value` to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
