// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD line   = EMA(fast) - EMA(slow)
//   Signal line = EMA(signal) of the MACD line
//   Histogram   = MACD line - Signal line
//
// All three series are aligned to the input closes.  The MACD line starts at
// index `slow - 1`, the signal line `signal - 1` samples later.
//
// Minimum sample requirement: max(slow, signal) + warm-up padding (default 10).
// =============================================================================

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::config::MacdParams;
use crate::error::{ensure_finite, require_samples, IndicatorError};
use crate::indicators::current_previous;
use crate::indicators::ema::{ema_of_defined, ema_series};
use crate::indicators::result::{IndicatorDetails, IndicatorKind, IndicatorResult};
use crate::market_data::Series;
use crate::signals::cross::detect_cross;

/// Side of the zero line the MACD line sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroLinePosition {
    Above,
    Below,
    Neutral,
}

impl ZeroLinePosition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Neutral => "neutral",
        }
    }
}

/// Aligned MACD output.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd_line: Vec<Option<f64>>,
    pub signal_line: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Compute aligned MACD, signal and histogram series.
pub fn macd_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);

    let macd_line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal_line = ema_of_defined(&macd_line, signal);

    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdSeries {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Zero-line position by the sign of the MACD line.  An undefined line is
/// reported as `neutral`.
pub fn zero_line_position(macd: Option<f64>) -> ZeroLinePosition {
    match macd {
        Some(v) if v > 0.0 => ZeroLinePosition::Above,
        Some(v) if v < 0.0 => ZeroLinePosition::Below,
        _ => ZeroLinePosition::Neutral,
    }
}

/// Full MACD calculation.
pub fn calculate(series: &Series, params: &MacdParams) -> Result<IndicatorResult, IndicatorError> {
    let timeframe = series.timeframe();
    require_samples(params.min_samples(), series.len())?;

    let closes = series.closes();
    let out = macd_series(&closes, params.fast, params.slow, params.signal);
    ensure_finite("MACD", &out.macd_line)?;
    ensure_finite("MACD", &out.signal_line)?;

    let (macd, prev_macd) = current_previous(&out.macd_line);
    let (signal, prev_signal) = current_previous(&out.signal_line);
    let (histogram, _) = current_previous(&out.histogram);

    if macd.is_none() {
        return Err(IndicatorError::computation(
            "MACD",
            "MACD line undefined despite sufficient samples",
        ));
    }

    let cross = detect_cross(macd, signal, prev_macd, prev_signal);
    let zero_line = zero_line_position(macd);

    debug!(
        timeframe = %timeframe,
        macd = ?macd.map(|v| format!("{v:.6}")),
        signal = ?signal.map(|v| format!("{v:.6}")),
        cross = cross.as_str(),
        "MACD calculated"
    );

    Ok(IndicatorResult {
        indicator: IndicatorKind::Macd,
        timeframe,
        parameters: format!("{},{},{}", params.fast, params.slow, params.signal),
        current_value: macd,
        previous_value: prev_macd,
        derived_state: zero_line.as_str(),
        derived_signal: cross.as_str(),
        sample_count: series.len(),
        computed_at: Utc::now(),
        details: IndicatorDetails::Macd {
            macd_line: macd,
            signal_line: signal,
            histogram,
            cross,
            zero_line,
        },
    })
}
