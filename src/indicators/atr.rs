// =============================================================================
// Average True Range (ATR): Wilder's Smoothing Method
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Volatility state compares the last two ATR readings:
//   current > previous * 1.1 => expanding
//   current < previous * 0.9 => contracting
//   otherwise                => stable
//   no previous reading      => neutral
// =============================================================================

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::config::VolatilityParams;
use crate::error::{ensure_finite, require_samples, IndicatorError};
use crate::indicators::current_previous;
use crate::indicators::ema::align;
use crate::indicators::result::{IndicatorDetails, IndicatorKind, IndicatorResult};
use crate::market_data::{Bar, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityState {
    Expanding,
    Contracting,
    Stable,
    Neutral,
}

impl VolatilityState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expanding => "expanding",
            Self::Contracting => "contracting",
            Self::Stable => "stable",
            Self::Neutral => "neutral",
        }
    }
}

/// True Range of every bar after the first.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev_close, high, low) = (w[0].close, w[1].high, w[1].low);
            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

/// Compact Wilder ATR series.  The first value belongs to bar `period`.
///
/// Returns an empty `Vec` when `period` is zero or there are fewer than
/// `period + 1` bars.  A non-finite intermediate value ends the series.
pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period + 1 {
        return Vec::new();
    }

    let tr_values = true_ranges(bars);

    // --- Seed ATR with SMA of first `period` TR values ---------------------
    let seed: f64 = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    // --- Wilder's smoothing for remaining TR values ------------------------
    let period_f = period as f64;
    let mut result = Vec::with_capacity(tr_values.len() - period + 1);
    result.push(seed);

    let mut atr = seed;
    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            break;
        }
        result.push(atr);
    }

    result
}

/// ATR aligned to the bars: `None` for the first `period` bars.
pub fn atr_series(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    align(bars.len(), period, calculate_atr(bars, period))
}

pub fn classify_volatility(current: Option<f64>, previous: Option<f64>) -> VolatilityState {
    let (Some(current), Some(previous)) = (current, previous) else {
        return VolatilityState::Neutral;
    };

    if current > previous * 1.1 {
        VolatilityState::Expanding
    } else if current < previous * 0.9 {
        VolatilityState::Contracting
    } else {
        VolatilityState::Stable
    }
}

/// Full ATR calculation.
pub fn calculate(
    series: &Series,
    params: &VolatilityParams,
) -> Result<IndicatorResult, IndicatorError> {
    let timeframe = series.timeframe();
    let period = params.atr_period;
    require_samples(period.max(1) + 1, series.len())?;

    let atr = atr_series(series.bars(), period);
    ensure_finite("ATR", &atr)?;

    let (current, previous) = current_previous(&atr);
    if current.is_none() {
        return Err(IndicatorError::computation(
            "ATR",
            "ATR undefined despite sufficient samples",
        ));
    }
    let state = classify_volatility(current, previous);

    debug!(
        timeframe = %timeframe,
        atr = ?current.map(|v| format!("{v:.5}")),
        state = state.as_str(),
        "ATR calculated"
    );

    Ok(IndicatorResult {
        indicator: IndicatorKind::Atr,
        timeframe,
        parameters: format!("ATR({period})"),
        current_value: current,
        previous_value: previous,
        derived_state: state.as_str(),
        derived_signal: "no_signal",
        sample_count: series.len(),
        computed_at: Utc::now(),
        details: IndicatorDetails::Atr { period, state },
    })
}
