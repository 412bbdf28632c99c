// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3: Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Levels:  RSI >= 70 => overbought,  RSI <= 30 => oversold.
//
// Level-cross signals use a strict departure and an inclusive arrival:
//   buy_signal  : prev <  30 AND cur >= 30
//   sell_signal : prev >  70 AND cur <= 70
// so a reading that sits exactly on a level on both bars is not a cross.
// =============================================================================

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::config::RsiParams;
use crate::error::{ensure_finite, require_samples, IndicatorError};
use crate::indicators::ema::align;
use crate::indicators::current_previous;
use crate::indicators::result::{IndicatorDetails, IndicatorKind, IndicatorResult};
use crate::market_data::Series;
use crate::signals::divergence::detect_divergence;
use crate::types::Timeframe;

/// Oscillator zone of the latest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiState {
    Overbought,
    Neutral,
    Oversold,
    Unknown,
}

impl RsiState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overbought => "overbought",
            Self::Neutral => "neutral",
            Self::Oversold => "oversold",
            Self::Unknown => "unknown",
        }
    }
}

/// Level-cross signal on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSignal {
    BuySignal,
    SellSignal,
    /// Shortest timeframe only: oversold without a fresh cross.
    BuyTiming,
    /// Shortest timeframe only: overbought without a fresh cross.
    SellTiming,
    Neutral,
    NoSignal,
}

impl RsiSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuySignal => "buy_signal",
            Self::SellSignal => "sell_signal",
            Self::BuyTiming => "buy_timing",
            Self::SellTiming => "sell_timing",
            Self::Neutral => "neutral",
            Self::NoSignal => "no_signal",
        }
    }
}

/// Fixed RSI levels, echoed into every result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RsiLevels {
    pub overbought: f64,
    pub neutral: f64,
    pub oversold: f64,
}

impl From<&RsiParams> for RsiLevels {
    fn from(p: &RsiParams) -> Self {
        Self {
            overbought: p.overbought,
            neutral: p.neutral,
            oversold: p.oversold,
        }
    }
}

/// Compute the compact RSI series for the given `closes` and `period`.
///
/// The returned vector has one RSI value for each close starting at index
/// `period` (the first `period` closes are consumed to seed the averages).
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `closes.len() < period + 1` => empty vec (need at least `period` deltas)
/// - If average loss is zero (no down moves), RSI is clamped to 100.0.
/// - Non-finite results are dropped and the series is truncated.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // --- Seed averages with SMA of first `period` deltas ---------------------
    let (sum_gain, sum_loss) = deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let Some(first_rsi) = rsi_from_averages(avg_gain, avg_loss) else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    result.push(first_rsi);

    // --- Wilder's smoothing for subsequent values ----------------------------
    for &delta in &deltas[period..] {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// RSI aligned to the input closes: `None` for the first `period` samples.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    align(closes.len(), period, calculate_rsi(closes, period))
}

/// Zone of a single RSI reading.  Boundaries are inclusive.
pub fn classify_state(value: Option<f64>, params: &RsiParams) -> RsiState {
    match value {
        None => RsiState::Unknown,
        Some(v) if v >= params.overbought => RsiState::Overbought,
        Some(v) if v <= params.oversold => RsiState::Oversold,
        Some(_) => RsiState::Neutral,
    }
}

/// Level-cross signal between two consecutive readings.
pub fn classify_signal(
    current: Option<f64>,
    previous: Option<f64>,
    timeframe: Timeframe,
    params: &RsiParams,
) -> RsiSignal {
    let (Some(current), Some(previous)) = (current, previous) else {
        return RsiSignal::NoSignal;
    };

    if previous < params.oversold && current >= params.oversold {
        return RsiSignal::BuySignal;
    }
    if previous > params.overbought && current <= params.overbought {
        return RsiSignal::SellSignal;
    }

    if timeframe == Timeframe::M5 {
        if current >= params.overbought {
            return RsiSignal::SellTiming;
        }
        if current <= params.oversold {
            return RsiSignal::BuyTiming;
        }
    }

    RsiSignal::Neutral
}

/// Full RSI calculation with the configured default period.
pub fn calculate(series: &Series, params: &RsiParams) -> Result<IndicatorResult, IndicatorError> {
    calculate_with_period(series, params, params.period, IndicatorKind::Rsi)
}

/// RSI at an explicit `period`, reported under `kind`.
///
/// Fails with `InsufficientData` when the series is shorter than `period`.
/// With exactly `period` bars the value is still undefined and the state is
/// `unknown`.
pub fn calculate_with_period(
    series: &Series,
    params: &RsiParams,
    period: usize,
    kind: IndicatorKind,
) -> Result<IndicatorResult, IndicatorError> {
    let timeframe = series.timeframe();
    require_samples(period.max(1), series.len())?;

    let closes = series.closes();
    let rsi = rsi_series(&closes, period);
    ensure_finite("RSI", &rsi)?;

    let (current, previous) = current_previous(&rsi);
    let state = classify_state(current, params);
    let signal = classify_signal(current, previous, timeframe, params);
    let highs = series.highs();
    let divergence = detect_divergence(Some(&highs), &rsi, params.divergence_window);

    debug!(
        timeframe = %timeframe,
        period,
        rsi = ?current.map(|v| format!("{v:.2}")),
        state = state.as_str(),
        signal = signal.as_str(),
        "RSI calculated"
    );

    Ok(IndicatorResult {
        indicator: kind,
        timeframe,
        parameters: format!("RSI({period})"),
        current_value: current,
        previous_value: previous,
        derived_state: state.as_str(),
        derived_signal: signal.as_str(),
        sample_count: series.len(),
        computed_at: Utc::now(),
        details: IndicatorDetails::Rsi {
            period,
            levels: RsiLevels::from(params),
            divergence,
        },
    })
}

/// Long / medium / short RSI variants at the configured variant periods.
pub fn rsi_variants(
    series: &Series,
    params: &RsiParams,
) -> Vec<(IndicatorKind, Result<IndicatorResult, IndicatorError>)> {
    let kinds = [IndicatorKind::RsiLong, IndicatorKind::RsiMedium, IndicatorKind::RsiShort];
    kinds
        .into_iter()
        .zip(params.variant_periods)
        .map(|(kind, period)| (kind, calculate_with_period(series, params, period, kind)))
        .collect()
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If both averages are zero, RSI is 50.0 (no movement).
/// - If average loss is zero (only gains), RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi)
    } else {
        None
    }
}
