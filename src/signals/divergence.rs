// =============================================================================
// Divergence Detection: price trend vs. indicator trend
// =============================================================================
//
// Over the trailing `window` samples:
//   price_trend     = last - first of the rolling `window`-bar high
//   indicator_trend = last - first of the indicator
//
//   price up,   indicator down => bearish_divergence
//   price down, indicator up   => bullish_divergence
//   otherwise                  => no_divergence

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceEvent {
    BullishDivergence,
    BearishDivergence,
    NoDivergence,
    InsufficientData,
    MissingHighColumn,
}

impl DivergenceEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BullishDivergence => "bullish_divergence",
            Self::BearishDivergence => "bearish_divergence",
            Self::NoDivergence => "no_divergence",
            Self::InsufficientData => "insufficient_data",
            Self::MissingHighColumn => "missing_high_column",
        }
    }
}

impl std::fmt::Display for DivergenceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare the trend of rolling price highs against the trend of `indicator`.
///
/// `highs` is `None` when the source carries no high prices.  Both slices are
/// aligned to the same bars.  Fewer than `2 * window` bars yields
/// `InsufficientData`; an undefined indicator endpoint yields `NoDivergence`.
pub fn detect_divergence(
    highs: Option<&[f64]>,
    indicator: &[Option<f64>],
    window: usize,
) -> DivergenceEvent {
    if window < 2 || indicator.len() < window * 2 {
        return DivergenceEvent::InsufficientData;
    }
    let Some(highs) = highs else {
        return DivergenceEvent::MissingHighColumn;
    };
    if highs.len() != indicator.len() {
        return DivergenceEvent::MissingHighColumn;
    }

    let n = highs.len();
    let rolling_high = |end: usize| -> f64 {
        highs[end + 1 - window..=end]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    };

    let price_trend = rolling_high(n - 1) - rolling_high(n - window);

    let (Some(first), Some(last)) = (indicator[n - window], indicator[n - 1]) else {
        return DivergenceEvent::NoDivergence;
    };
    let indicator_trend = last - first;

    if price_trend > 0.0 && indicator_trend < 0.0 {
        DivergenceEvent::BearishDivergence
    } else if price_trend < 0.0 && indicator_trend > 0.0 {
        DivergenceEvent::BullishDivergence
    } else {
        DivergenceEvent::NoDivergence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn bearish_when_highs_rise_and_indicator_falls() {
        let highs: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let rsi = defined(&[60.0, 61.0, 62.0, 63.0, 64.0, 70.0, 68.0, 66.0, 64.0, 62.0]);
        assert_eq!(
            detect_divergence(Some(&highs), &rsi, 5),
            DivergenceEvent::BearishDivergence
        );
    }

    #[test]
    fn bullish_when_highs_fall_and_indicator_rises() {
        let highs: Vec<f64> = (0..10).map(|i| 120.0 - i as f64).collect();
        let rsi = defined(&[40.0, 39.0, 38.0, 37.0, 36.0, 30.0, 32.0, 34.0, 36.0, 38.0]);
        assert_eq!(
            detect_divergence(Some(&highs), &rsi, 5),
            DivergenceEvent::BullishDivergence
        );
    }

    #[test]
    fn same_direction_is_no_divergence() {
        let highs: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let rsi = defined(&[50.0, 51.0, 52.0, 53.0, 54.0, 55.0, 56.0, 57.0, 58.0, 59.0]);
        assert_eq!(detect_divergence(Some(&highs), &rsi, 5), DivergenceEvent::NoDivergence);
    }

    #[test]
    fn short_window_is_insufficient() {
        let highs = vec![1.0; 9];
        let rsi = vec![Some(50.0); 9];
        assert_eq!(detect_divergence(Some(&highs), &rsi, 5), DivergenceEvent::InsufficientData);
    }

    #[test]
    fn missing_highs() {
        let rsi = vec![Some(50.0); 12];
        assert_eq!(detect_divergence(None, &rsi, 5), DivergenceEvent::MissingHighColumn);
    }

    #[test]
    fn undefined_indicator_endpoint_is_no_divergence() {
        let highs: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let mut rsi = defined(&[50.0; 10]);
        rsi[5] = None;
        assert_eq!(detect_divergence(Some(&highs), &rsi, 5), DivergenceEvent::NoDivergence);
    }
}
