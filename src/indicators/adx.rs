// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. Compute +DM (positive directional movement) and -DM per bar.
//   2. Compute True Range (TR) per bar.
//   3. Apply Wilder's smoothing (period) to +DM, -DM, and TR.
//   4. Derive +DI = smoothed(+DM) / smoothed(TR) * 100
//            -DI = smoothed(-DM) / smoothed(TR) * 100
//   5. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   6. ADX = Wilder's smoothed average of DX over `period` bars.
//
// Trend strength:
//   ADX >= 25 => strong_trend
//   ADX >= 20 => moderate_trend
//   otherwise => weak_trend
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

/// Trend strength bucket of the latest ADX reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    StrongTrend,
    ModerateTrend,
    WeakTrend,
}

impl TrendStrength {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongTrend => "strong_trend",
            Self::ModerateTrend => "moderate_trend",
            Self::WeakTrend => "weak_trend",
        }
    }
}

/// Compact ADX series from a slice of bars (oldest first).
///
/// The first value belongs to bar `2 * period - 1`: `period` transitions seed
/// the smoothed +DM / -DM / TR and `period` DX values seed the ADX average.
///
/// Returns an empty `Vec` when `period` is zero or there are too few bars.
/// A non-finite smoothed value ends the series.
pub fn calculate_adx(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < 2 * period {
        return Vec::new();
    }

    let period_f = period as f64;

    // ------------------------------------------------------------------
    // Step 1 & 2: Raw +DM, -DM, and True Range for each consecutive pair
    // ------------------------------------------------------------------
    let bar_count = bars.len() - 1;

    let mut plus_dm = Vec::with_capacity(bar_count);
    let mut minus_dm = Vec::with_capacity(bar_count);
    let mut tr_vals = Vec::with_capacity(bar_count);

    for w in bars.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);

        let tr = (cur.high - cur.low)
            .max((cur.high - prev.close).abs())
            .max((cur.low - prev.close).abs());

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        tr_vals.push(tr);
    }

    // ------------------------------------------------------------------
    // Step 3-5: Wilder's smoothing of +DM, -DM, TR and the DX per bar
    // ------------------------------------------------------------------
    let mut smooth_plus_dm: f64 = plus_dm[..period].iter().sum();
    let mut smooth_minus_dm: f64 = minus_dm[..period].iter().sum();
    let mut smooth_tr: f64 = tr_vals[..period].iter().sum();

    let mut dx_values: Vec<f64> = Vec::with_capacity(bar_count - period + 1);
    dx_values.push(compute_dx(smooth_plus_dm, smooth_minus_dm, smooth_tr));

    for i in period..bar_count {
        smooth_plus_dm = smooth_plus_dm - smooth_plus_dm / period_f + plus_dm[i];
        smooth_minus_dm = smooth_minus_dm - smooth_minus_dm / period_f + minus_dm[i];
        smooth_tr = smooth_tr - smooth_tr / period_f + tr_vals[i];

        dx_values.push(compute_dx(smooth_plus_dm, smooth_minus_dm, smooth_tr));
    }

    // ------------------------------------------------------------------
    // Step 6: ADX = Wilder's smoothed average of DX
    // ------------------------------------------------------------------
    if dx_values.len() < period {
        return Vec::new();
    }

    let seed: f64 = dx_values[..period].iter().sum::<f64>() / period_f;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(dx_values.len() - period + 1);
    result.push(seed);

    let mut adx = seed;
    for &dx in &dx_values[period..] {
        adx = (adx * (period_f - 1.0) + dx) / period_f;
        if !adx.is_finite() {
            break;
        }
        result.push(adx);
    }

    result
}

/// ADX aligned to the bars: `None` before bar `2 * period - 1`.
pub fn adx_series(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    align(bars.len(), (2 * period).saturating_sub(1), calculate_adx(bars, period))
}

pub fn classify_strength(adx: f64) -> TrendStrength {
    if adx >= 25.0 {
        TrendStrength::StrongTrend
    } else if adx >= 20.0 {
        TrendStrength::ModerateTrend
    } else {
        TrendStrength::WeakTrend
    }
}

/// Full ADX calculation.  Needs `2 * period + 1` bars so that both the
/// current and the previous reading exist.
pub fn calculate(
    series: &Series,
    params: &VolatilityParams,
) -> Result<IndicatorResult, IndicatorError> {
    let timeframe = series.timeframe();
    let period = params.adx_period;
    require_samples(2 * period.max(1) + 1, series.len())?;

    let adx = adx_series(series.bars(), period);
    ensure_finite("ADX", &adx)?;

    let (current, previous) = current_previous(&adx);
    let Some(value) = current else {
        return Err(IndicatorError::computation(
            "ADX",
            "ADX undefined despite sufficient samples",
        ));
    };
    let state = classify_strength(value);

    debug!(
        timeframe = %timeframe,
        adx = format!("{value:.1}"),
        state = state.as_str(),
        "ADX calculated"
    );

    Ok(IndicatorResult {
        indicator: IndicatorKind::Adx,
        timeframe,
        parameters: format!("ADX({period})"),
        current_value: current,
        previous_value: previous,
        derived_state: state.as_str(),
        derived_signal: "no_signal",
        sample_count: series.len(),
        computed_at: Utc::now(),
        details: IndicatorDetails::Adx { period, state },
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Compute DX from smoothed +DM, -DM, and TR values.
///
/// A window without any range (flat bars) has +DI = -DI = 0 and DX = 0.
fn compute_dx(smooth_plus_dm: f64, smooth_minus_dm: f64, smooth_tr: f64) -> f64 {
    if smooth_tr == 0.0 {
        return 0.0;
    }

    let plus_di = (smooth_plus_dm / smooth_tr) * 100.0;
    let minus_di = (smooth_minus_dm / smooth_tr) * 100.0;

    let di_sum = plus_di + minus_di;
    if di_sum == 0.0 {
        return 0.0;
    }

    ((plus_di - minus_di).abs() / di_sum) * 100.0
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::types::Timeframe;

    fn bars(specs: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        specs
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                timestamp: start + Duration::hours(i as i64),
                open,
                high,
                low,
                close,
                volume: None,
            })
            .collect()
    }

    fn trending(n: usize) -> Vec<Bar> {
        let specs: Vec<_> = (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                (base, base + 1.5, base - 0.5, base + 1.0)
            })
            .collect();
        bars(&specs)
    }

    #[test]
    fn adx_period_zero() {
        assert!(calculate_adx(&trending(50), 0).is_empty());
    }

    #[test]
    fn adx_insufficient_data() {
        assert!(calculate_adx(&trending(10), 14).is_empty());
    }

    #[test]
    fn adx_strong_uptrend() {
        let adx = calculate_adx(&trending(60), 14);
        let value = *adx.last().unwrap();
        assert!(value > 25.0, "expected ADX > 25 for strong trend, got {value}");
    }

    #[test]
    fn adx_flat_market() {
        // Identical bars: no directional movement, DX = 0 for every bar.
        let adx = calculate_adx(&bars(&[(100.0, 101.0, 99.0, 100.0); 60]), 14);
        let value = *adx.last().unwrap();
        assert!(value < 1.0, "expected ADX near 0 for flat market, got {value}");
    }

    #[test]
    fn adx_result_range() {
        let specs: Vec<_> = (0..100)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.3).sin() * 10.0;
                (base - 0.5, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        for value in calculate_adx(&bars(&specs), 14) {
            assert!((0.0..=100.0).contains(&value), "ADX {value} out of [0,100] range");
        }
    }

    #[test]
    fn series_alignment() {
        let adx = adx_series(&trending(40), 5);
        assert!(adx[..9].iter().all(Option::is_none));
        assert!(adx[9..].iter().all(Option::is_some));
    }

    #[test]
    fn strength_thresholds() {
        assert_eq!(classify_strength(25.0), TrendStrength::StrongTrend);
        assert_eq!(classify_strength(24.9), TrendStrength::ModerateTrend);
        assert_eq!(classify_strength(20.0), TrendStrength::ModerateTrend);
        assert_eq!(classify_strength(19.9), TrendStrength::WeakTrend);
    }

    #[test]
    fn calculate_on_trend() {
        let series = Series::from_bars(Timeframe::H1, trending(60)).unwrap();
        let result = calculate(&series, &VolatilityParams::default()).unwrap();
        assert_eq!(result.derived_state, "strong_trend");
        assert!(result.previous_value.is_some());
    }

    #[test]
    fn flat_lead_in_then_trend_is_computed() {
        let mut specs = vec![(100.0, 100.0, 100.0, 100.0); 20];
        specs.extend((1..=60).map(|i| {
            let base = 100.0 + i as f64 * 2.0;
            (base, base + 1.5, base - 0.5, base + 1.0)
        }));
        let b = bars(&specs);

        let adx = adx_series(&b, 14);
        assert!(adx[27..].iter().all(|v| v.is_some_and(f64::is_finite)));
        assert!(adx[79].unwrap() > adx[27].unwrap());

        let series = Series::from_bars(Timeframe::H1, b).unwrap();
        let result = calculate(&series, &VolatilityParams::default()).unwrap();
        let value = result.current_value.unwrap();
        assert!(value.is_finite() && value > 25.0, "expected trending ADX, got {value}");
        assert_eq!(result.derived_state, "strong_trend");
    }

    #[test]
    fn all_flat_bars_give_zero_adx() {
        let series = Series::from_bars(Timeframe::H1, bars(&[(100.0, 100.0, 100.0, 100.0); 40])).unwrap();
        let result = calculate(&series, &VolatilityParams::default()).unwrap();
        assert!(result.current_value.unwrap().abs() < 1e-10);
        assert_eq!(result.derived_state, "weak_trend");
    }

    #[test]
    fn calculate_minimum_bars() {
        let params = VolatilityParams::default();
        let series = Series::from_bars(Timeframe::H1, trending(28)).unwrap();
        let err = calculate(&series, &params).unwrap_err();
        assert_eq!(err, IndicatorError::InsufficientData { required: 29, got: 28 });

        let series = Series::from_bars(Timeframe::H1, trending(29)).unwrap();
        assert!(calculate(&series, &params).is_ok());
    }
}
