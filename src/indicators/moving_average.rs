// =============================================================================
// Moving Averages: single-period and short / medium / long
// =============================================================================
//
// Single-period mode: one SMA or EMA, price position against it and its slope.
// Triple mode: SMA(short), SMA(medium), SMA(long) with
//
//   strong_uptrend   : price > short > medium > long
//   uptrend          : short > medium > long
//   strong_downtrend : price < short < medium < long
//   downtrend        : short < medium < long
//   sideways         : anything else
//
// plus per-average slopes, pairwise golden / dead crosses and the current
// averages as support / resistance levels.
//
// Slope: least-squares fit over the trailing `slope_window + 1` values of the
// average, classified against ±`slope_threshold`.
// =============================================================================

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MovingAverageParams;
use crate::error::{ensure_finite, require_samples, IndicatorError};
use crate::indicators::current_previous;
use crate::indicators::ema::{ema_series, sma_series};
use crate::indicators::result::{round_to, IndicatorDetails, IndicatorKind, IndicatorResult};
use crate::market_data::Series;
use crate::signals::cross::{detect_cross, CrossEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaType {
    Sma,
    Ema,
}

impl MaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sma => "SMA",
            Self::Ema => "EMA",
        }
    }
}

/// Price against a single average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePosition {
    Uptrend,
    Downtrend,
    Neutral,
    Unknown,
}

impl PricePosition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uptrend => "uptrend",
            Self::Downtrend => "downtrend",
            Self::Neutral => "neutral",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    Rising,
    Falling,
    Flat,
    InsufficientData,
}

impl Slope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Flat => "flat",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

/// Ordering of price and the three averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPosition {
    StrongUptrend,
    Uptrend,
    StrongDowntrend,
    Downtrend,
    Sideways,
    Unknown,
}

impl TrendPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongUptrend => "strong_uptrend",
            Self::Uptrend => "uptrend",
            Self::StrongDowntrend => "strong_downtrend",
            Self::Downtrend => "downtrend",
            Self::Sideways => "sideways",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendAlignment {
    Aligned,
    Diverging,
    Unknown,
}

/// A pair of averages checked for crosses.  The first member is the faster one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaPair {
    ShortMedium,
    MediumLong,
    ShortLong,
}

impl MaPair {
    pub const ALL: [MaPair; 3] = [MaPair::ShortMedium, MaPair::MediumLong, MaPair::ShortLong];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShortMedium => "short_medium",
            Self::MediumLong => "medium_long",
            Self::ShortLong => "short_long",
        }
    }
}

impl std::fmt::Display for MaPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Classifiers
// =============================================================================

pub fn price_position(price: f64, average: Option<f64>) -> PricePosition {
    match average {
        None => PricePosition::Unknown,
        Some(ma) if price > ma => PricePosition::Uptrend,
        Some(ma) if price < ma => PricePosition::Downtrend,
        Some(_) => PricePosition::Neutral,
    }
}

pub fn trend_position(
    price: f64,
    short: Option<f64>,
    medium: Option<f64>,
    long: Option<f64>,
) -> TrendPosition {
    let (Some(s), Some(m), Some(l)) = (short, medium, long) else {
        return TrendPosition::Unknown;
    };

    if price > s && s > m && m > l {
        TrendPosition::StrongUptrend
    } else if s > m && m > l {
        TrendPosition::Uptrend
    } else if price < s && s < m && m < l {
        TrendPosition::StrongDowntrend
    } else if s < m && m < l {
        TrendPosition::Downtrend
    } else {
        TrendPosition::Sideways
    }
}

/// Least-squares slope of `values` against their index.
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });

    let slope = num / den;
    slope.is_finite().then_some(slope)
}

/// Slope of the trailing `window + 1` values of an aligned average.  Every
/// value in that span must be defined.
pub fn classify_slope(average: &[Option<f64>], window: usize, threshold: f64) -> Slope {
    let span = window + 1;
    if average.len() < span {
        return Slope::InsufficientData;
    }
    let Some(tail) = average[average.len() - span..]
        .iter()
        .copied()
        .collect::<Option<Vec<f64>>>()
    else {
        return Slope::InsufficientData;
    };

    match linear_slope(&tail) {
        Some(s) if s > threshold => Slope::Rising,
        Some(s) if s < -threshold => Slope::Falling,
        Some(_) => Slope::Flat,
        None => Slope::InsufficientData,
    }
}

pub fn trend_alignment(slopes: &[Slope]) -> TrendAlignment {
    if slopes.is_empty() || slopes.contains(&Slope::InsufficientData) {
        return TrendAlignment::Unknown;
    }
    if slopes.iter().all(|s| *s == slopes[0]) {
        TrendAlignment::Aligned
    } else {
        TrendAlignment::Diverging
    }
}

/// Collapse pairwise crosses into one signal for the result record.
fn summarize_crosses(crosses: &BTreeMap<MaPair, CrossEvent>) -> &'static str {
    let golden = crosses.values().any(|c| *c == CrossEvent::GoldenCross);
    let dead = crosses.values().any(|c| *c == CrossEvent::DeadCross);
    match (golden, dead) {
        (true, true) => "mixed_cross",
        (true, false) => "golden_cross",
        (false, true) => "dead_cross",
        (false, false) => "no_cross",
    }
}

// =============================================================================
// Calculators
// =============================================================================

/// One average at an explicit period and type.
pub fn calculate_single(
    series: &Series,
    period: usize,
    ma_type: MaType,
    params: &MovingAverageParams,
) -> Result<IndicatorResult, IndicatorError> {
    let timeframe = series.timeframe();
    require_samples(period + params.warmup_padding, series.len())?;

    let closes = series.closes();
    let average = match ma_type {
        MaType::Sma => sma_series(&closes, period),
        MaType::Ema => ema_series(&closes, period),
    };
    ensure_finite("MovingAverage", &average)?;

    let (current, previous) = current_previous(&average);
    if current.is_none() {
        return Err(IndicatorError::computation(
            "MovingAverage",
            format!("{}({period}) undefined despite sufficient samples", ma_type.as_str()),
        ));
    }

    let price = *closes.last().ok_or_else(|| IndicatorError::malformed("empty series"))?;
    let position = price_position(price, current);
    let slope = classify_slope(&average, params.slope_window, params.slope_threshold);

    debug!(
        timeframe = %timeframe,
        ma = %format!("{}({period})", ma_type.as_str()),
        position = position.as_str(),
        slope = slope.as_str(),
        "moving average calculated"
    );

    Ok(IndicatorResult {
        indicator: IndicatorKind::MovingAverage,
        timeframe,
        parameters: format!("{}({period})", ma_type.as_str()),
        current_value: current,
        previous_value: previous,
        derived_state: position.as_str(),
        derived_signal: slope.as_str(),
        sample_count: series.len(),
        computed_at: Utc::now(),
        details: IndicatorDetails::MovingAverage {
            period,
            ma_type,
            price,
            position,
            slope,
        },
    })
}

/// Short / medium / long simple averages.
pub fn calculate_triple(
    series: &Series,
    params: &MovingAverageParams,
) -> Result<IndicatorResult, IndicatorError> {
    let timeframe = series.timeframe();
    let longest = params.short.max(params.medium).max(params.long);
    require_samples(longest + params.warmup_padding, series.len())?;

    let closes = series.closes();
    let periods = [params.short, params.medium, params.long];
    let averages: Vec<Vec<Option<f64>>> = periods.iter().map(|&p| sma_series(&closes, p)).collect();
    for average in &averages {
        ensure_finite("MovingAverages", average)?;
    }

    let (short, prev_short) = current_previous(&averages[0]);
    let (medium, prev_medium) = current_previous(&averages[1]);
    let (long, prev_long) = current_previous(&averages[2]);

    if short.is_none() || medium.is_none() || long.is_none() {
        return Err(IndicatorError::computation(
            "MovingAverages",
            "average undefined despite sufficient samples",
        ));
    }

    let price = *closes.last().ok_or_else(|| IndicatorError::malformed("empty series"))?;
    let position = trend_position(price, short, medium, long);

    let slope_list: Vec<Slope> = averages
        .iter()
        .map(|a| classify_slope(a, params.slope_window, params.slope_threshold))
        .collect();
    let trend_alignment = trend_alignment(&slope_list);
    let slopes: BTreeMap<usize, Slope> = periods.into_iter().zip(slope_list).collect();

    let mut crosses = BTreeMap::new();
    for pair in MaPair::ALL {
        let ((fast, prev_fast), (slow, prev_slow)) = match pair {
            MaPair::ShortMedium => ((short, prev_short), (medium, prev_medium)),
            MaPair::MediumLong => ((medium, prev_medium), (long, prev_long)),
            MaPair::ShortLong => ((short, prev_short), (long, prev_long)),
        };
        if prev_fast.is_none() || prev_slow.is_none() {
            continue;
        }
        crosses.insert(pair, detect_cross(fast, slow, prev_fast, prev_slow));
    }
    let signal = summarize_crosses(&crosses);

    let support_resistance: BTreeMap<usize, f64> = periods
        .into_iter()
        .zip([short, medium, long])
        .filter_map(|(p, v)| Some((p, round_to(v?, 4))))
        .collect();

    debug!(
        timeframe = %timeframe,
        price,
        position = position.as_str(),
        crosses = signal,
        "moving averages calculated"
    );

    Ok(IndicatorResult {
        indicator: IndicatorKind::MovingAverages,
        timeframe,
        parameters: format!("MA({},{},{})", params.short, params.medium, params.long),
        current_value: short,
        previous_value: prev_short,
        derived_state: position.as_str(),
        derived_signal: signal,
        sample_count: series.len(),
        computed_at: Utc::now(),
        details: IndicatorDetails::TripleMovingAverage {
            price,
            short,
            medium,
            long,
            position,
            slopes,
            trend_alignment,
            crosses,
            support_resistance,
        },
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::bar::test_support::{ascending, descending, series_from_closes};
    use crate::types::Timeframe;

    fn small_params() -> MovingAverageParams {
        MovingAverageParams {
            short: 2,
            medium: 3,
            long: 4,
            warmup_padding: 0,
            ..MovingAverageParams::default()
        }
    }

    // ---- classifiers -----------------------------------------------------

    #[test]
    fn strong_uptrend_requires_strict_ordering() {
        let (s, m, l) = (Some(106.0), Some(104.0), Some(100.0));
        assert_eq!(trend_position(107.0, s, m, l), TrendPosition::StrongUptrend);
        // Price between short and medium.
        assert_eq!(trend_position(105.0, s, m, l), TrendPosition::Uptrend);
        // Price equal to short is not strictly above it.
        assert_eq!(trend_position(106.0, s, m, l), TrendPosition::Uptrend);
    }

    #[test]
    fn downtrend_and_sideways() {
        let (s, m, l) = (Some(94.0), Some(96.0), Some(100.0));
        assert_eq!(trend_position(93.0, s, m, l), TrendPosition::StrongDowntrend);
        assert_eq!(trend_position(95.0, s, m, l), TrendPosition::Downtrend);
        assert_eq!(trend_position(95.0, Some(97.0), m, l), TrendPosition::Sideways);
        assert_eq!(trend_position(95.0, None, m, l), TrendPosition::Unknown);
    }

    #[test]
    fn price_position_against_single_average() {
        assert_eq!(price_position(101.0, Some(100.0)), PricePosition::Uptrend);
        assert_eq!(price_position(99.0, Some(100.0)), PricePosition::Downtrend);
        assert_eq!(price_position(100.0, Some(100.0)), PricePosition::Neutral);
        assert_eq!(price_position(100.0, None), PricePosition::Unknown);
    }

    #[test]
    fn linear_slope_known_values() {
        assert!((linear_slope(&[1.0, 2.0, 3.0, 4.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!(linear_slope(&[5.0, 5.0, 5.0]).unwrap().abs() < 1e-12);
        assert_eq!(linear_slope(&[1.0]), None);
    }

    #[test]
    fn slope_threshold_and_gaps() {
        let rising: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64 * 0.01)).collect();
        assert_eq!(classify_slope(&rising, 5, 0.001), Slope::Rising);

        let flat: Vec<Option<f64>> = (0..10).map(|i| Some(1.0 + i as f64 * 0.0001)).collect();
        assert_eq!(classify_slope(&flat, 5, 0.001), Slope::Flat);

        let falling: Vec<Option<f64>> = (0..10).map(|i| Some(-(i as f64))).collect();
        assert_eq!(classify_slope(&falling, 5, 0.001), Slope::Falling);

        let gapped = vec![None, None, None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        assert_eq!(classify_slope(&gapped, 5, 0.001), Slope::InsufficientData);
    }

    #[test]
    fn alignment_rules() {
        assert_eq!(trend_alignment(&[Slope::Rising; 3]), TrendAlignment::Aligned);
        assert_eq!(
            trend_alignment(&[Slope::Rising, Slope::Flat, Slope::Rising]),
            TrendAlignment::Diverging
        );
        assert_eq!(
            trend_alignment(&[Slope::Rising, Slope::InsufficientData, Slope::Rising]),
            TrendAlignment::Unknown
        );
    }

    // ---- single mode -----------------------------------------------------

    #[test]
    fn single_sma_in_rally() {
        let series = series_from_closes(Timeframe::H1, &ascending(40));
        let result = calculate_single(&series, 20, MaType::Sma, &MovingAverageParams::default()).unwrap();
        assert_eq!(result.parameters, "SMA(20)");
        assert_eq!(result.derived_state, "uptrend");
        assert_eq!(result.derived_signal, "rising");
        assert!((result.current_value.unwrap() - 130.5).abs() < 1e-10);
        assert!((result.previous_value.unwrap() - 129.5).abs() < 1e-10);
    }

    #[test]
    fn single_ema_in_decline() {
        let series = series_from_closes(Timeframe::H1, &descending(40));
        let result = calculate_single(&series, 20, MaType::Ema, &MovingAverageParams::default()).unwrap();
        assert_eq!(result.parameters, "EMA(20)");
        assert_eq!(result.derived_state, "downtrend");
        assert_eq!(result.derived_signal, "falling");
    }

    #[test]
    fn single_insufficient_data() {
        let series = series_from_closes(Timeframe::H1, &ascending(29));
        let err = calculate_single(&series, 20, MaType::Sma, &MovingAverageParams::default()).unwrap_err();
        assert_eq!(err, IndicatorError::InsufficientData { required: 30, got: 29 });
    }

    // ---- triple mode -----------------------------------------------------

    #[test]
    fn triple_in_long_rally() {
        let series = series_from_closes(Timeframe::H4, &ascending(220));
        let result = calculate_triple(&series, &MovingAverageParams::default()).unwrap();
        assert_eq!(result.parameters, "MA(20,50,200)");
        assert_eq!(result.derived_state, "strong_uptrend");
        assert_eq!(result.derived_signal, "no_cross");
        match result.details {
            IndicatorDetails::TripleMovingAverage {
                trend_alignment,
                slopes,
                crosses,
                support_resistance,
                ..
            } => {
                assert_eq!(trend_alignment, TrendAlignment::Aligned);
                assert_eq!(slopes[&200], Slope::Rising);
                assert_eq!(crosses.len(), 3);
                assert!(crosses.values().all(|c| *c == CrossEvent::NoCross));
                assert!((support_resistance[&20] - 310.5).abs() < 1e-10);
                assert!((support_resistance[&200] - 220.5).abs() < 1e-10);
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn triple_insufficient_data() {
        let series = series_from_closes(Timeframe::H4, &ascending(209));
        let err = calculate_triple(&series, &MovingAverageParams::default()).unwrap_err();
        assert_eq!(err, IndicatorError::InsufficientData { required: 210, got: 209 });
    }

    #[test]
    fn triple_detects_golden_crosses_on_breakout() {
        // SMA2 / SMA3 / SMA4 all turn up through each other on the last bar.
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 9.0, 12.0];
        let series = series_from_closes(Timeframe::H1, &closes);
        let result = calculate_triple(&series, &small_params()).unwrap();
        assert_eq!(result.derived_signal, "golden_cross");
        assert_eq!(result.derived_state, "strong_uptrend");
        match result.details {
            IndicatorDetails::TripleMovingAverage {
                crosses,
                trend_alignment,
                ..
            } => {
                assert_eq!(crosses[&MaPair::ShortMedium], CrossEvent::GoldenCross);
                assert_eq!(crosses[&MaPair::MediumLong], CrossEvent::GoldenCross);
                assert_eq!(crosses[&MaPair::ShortLong], CrossEvent::GoldenCross);
                // SMA3 and SMA4 have too few defined values for the slope span.
                assert_eq!(trend_alignment, TrendAlignment::Unknown);
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn triple_skips_pairs_without_previous_value() {
        // Exactly `long` bars: the long average has no previous slot.
        let series = series_from_closes(Timeframe::H1, &[10.0, 11.0, 12.0, 13.0]);
        let result = calculate_triple(&series, &small_params()).unwrap();
        match result.details {
            IndicatorDetails::TripleMovingAverage { crosses, .. } => {
                assert_eq!(crosses.len(), 1);
                assert!(crosses.contains_key(&MaPair::ShortMedium));
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn mixed_crosses_summary() {
        let mut crosses = BTreeMap::new();
        crosses.insert(MaPair::ShortMedium, CrossEvent::GoldenCross);
        crosses.insert(MaPair::MediumLong, CrossEvent::DeadCross);
        assert_eq!(summarize_crosses(&crosses), "mixed_cross");
        crosses.clear();
        assert_eq!(summarize_crosses(&crosses), "no_cross");
    }
}
