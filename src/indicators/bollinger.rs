// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ).  σ is the population standard deviation of
// the window.  The Band Width (BBW) is the normalised distance:
//   BBW = (upper - lower) / middle * 100.
//
// Price position, first match wins:
//   price >= upper  => above_upper_band
//   price <= lower  => below_lower_band
//   price >  middle => above_middle
//   otherwise       => below_middle
//
// Band walk: within the trailing window, closes at or above upper * (1 - tol)
// (or at or below lower * (1 + tol)) count as touches.  A walk needs touches
// on at least `walk_ratio` of the window.
// =============================================================================

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::config::BollingerParams;
use crate::error::{ensure_finite, require_samples, IndicatorError};
use crate::indicators::current_previous;
use crate::indicators::ema::sma_series;
use crate::indicators::result::{IndicatorDetails, IndicatorKind, IndicatorResult};
use crate::market_data::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    AboveUpperBand,
    BelowLowerBand,
    AboveMiddle,
    BelowMiddle,
    Unknown,
}

impl BandPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AboveUpperBand => "above_upper_band",
            Self::BelowLowerBand => "below_lower_band",
            Self::AboveMiddle => "above_middle",
            Self::BelowMiddle => "below_middle",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandWalk {
    UpperBandWalk,
    LowerBandWalk,
    NoBandWalk,
}

impl BandWalk {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpperBandWalk => "upper_band_walk",
            Self::LowerBandWalk => "lower_band_walk",
            Self::NoBandWalk => "no_band_walk",
        }
    }
}

/// Aligned band series.
#[derive(Debug, Clone)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Compute aligned upper / middle / lower bands.
///
/// Slots before index `period - 1` are `None`.
pub fn bollinger_series(closes: &[f64], period: usize, num_std: f64) -> BollingerSeries {
    let middle = sma_series(closes, period);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    for (i, mean) in middle.iter().enumerate() {
        let Some(mean) = *mean else { continue };
        let window = &closes[i + 1 - period..=i];
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let std_dev = variance.sqrt();
        upper[i] = Some(mean + num_std * std_dev);
        lower[i] = Some(mean - num_std * std_dev);
    }

    BollingerSeries {
        upper,
        middle,
        lower,
    }
}

/// Classify `price` against one band triple.
pub fn band_position(
    price: f64,
    upper: Option<f64>,
    middle: Option<f64>,
    lower: Option<f64>,
) -> BandPosition {
    let (Some(upper), Some(middle), Some(lower)) = (upper, middle, lower) else {
        return BandPosition::Unknown;
    };

    if price >= upper {
        BandPosition::AboveUpperBand
    } else if price <= lower {
        BandPosition::BelowLowerBand
    } else if price > middle {
        BandPosition::AboveMiddle
    } else {
        BandPosition::BelowMiddle
    }
}

/// Detect a band walk over the trailing `params.walk_window` bars.
///
/// Bars whose band is still undefined never count as touches.
pub fn detect_band_walk(
    closes: &[f64],
    bands: &BollingerSeries,
    params: &BollingerParams,
) -> BandWalk {
    let window = params.walk_window.min(closes.len());
    if window == 0 {
        return BandWalk::NoBandWalk;
    }
    let start = closes.len() - window;
    let needed = window as f64 * params.walk_ratio;

    let touches = |band: &[Option<f64>], touching: &dyn Fn(f64, f64) -> bool| {
        closes[start..]
            .iter()
            .zip(&band[start..])
            .filter(|&(&close, band)| band.is_some_and(|b| touching(close, b)))
            .count() as f64
    };

    let upper_touches = touches(&bands.upper, &|c, u| c >= u * (1.0 - params.walk_tolerance));
    if upper_touches >= needed {
        return BandWalk::UpperBandWalk;
    }

    let lower_touches = touches(&bands.lower, &|c, l| c <= l * (1.0 + params.walk_tolerance));
    if lower_touches >= needed {
        return BandWalk::LowerBandWalk;
    }

    BandWalk::NoBandWalk
}

/// Band width as a percentage of the middle band.
pub fn band_width_pct(upper: Option<f64>, middle: Option<f64>, lower: Option<f64>) -> Option<f64> {
    let middle = middle.filter(|m| *m != 0.0)?;
    let width = (upper? - lower?) / middle * 100.0;
    width.is_finite().then_some(width)
}

/// Full Bollinger Band calculation.
pub fn calculate(
    series: &Series,
    params: &BollingerParams,
) -> Result<IndicatorResult, IndicatorError> {
    let timeframe = series.timeframe();
    require_samples(params.min_samples(), series.len())?;

    let closes = series.closes();
    let bands = bollinger_series(&closes, params.period, params.deviation);
    ensure_finite("BollingerBands", &bands.upper)?;
    ensure_finite("BollingerBands", &bands.lower)?;

    let (upper, _) = current_previous(&bands.upper);
    let (middle, prev_middle) = current_previous(&bands.middle);
    let (lower, _) = current_previous(&bands.lower);

    if middle.is_none() {
        return Err(IndicatorError::computation(
            "BollingerBands",
            "middle band undefined despite sufficient samples",
        ));
    }

    let price = *closes.last().ok_or_else(|| IndicatorError::malformed("empty series"))?;
    let position = band_position(price, upper, middle, lower);
    let band_walk = detect_band_walk(&closes, &bands, params);
    let width = band_width_pct(upper, middle, lower);

    debug!(
        timeframe = %timeframe,
        price,
        position = position.as_str(),
        band_walk = band_walk.as_str(),
        width = ?width.map(|v| format!("{v:.3}")),
        "Bollinger Bands calculated"
    );

    Ok(IndicatorResult {
        indicator: IndicatorKind::BollingerBands,
        timeframe,
        parameters: format!("BB({},{})", params.period, params.deviation),
        current_value: middle,
        previous_value: prev_middle,
        derived_state: position.as_str(),
        derived_signal: band_walk.as_str(),
        sample_count: series.len(),
        computed_at: Utc::now(),
        details: IndicatorDetails::Bollinger {
            price,
            upper,
            middle,
            lower,
            position,
            band_walk,
            band_width_pct: width,
        },
    })
}
