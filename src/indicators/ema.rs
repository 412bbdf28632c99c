// =============================================================================
// Simple and Exponential Moving Averages (SMA / EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period` closes.
//
// The `*_series` variants return one slot per input sample; slots inside the
// warm-up window are `None` so that index `i` always refers to sample `i`.
// =============================================================================

/// Compute the compact EMA series for `values` and look-back `period`.
///
/// Each output element corresponds to an input starting at index
/// `period - 1`.  Returns an empty `Vec` when the input is too short or the
/// period is zero.  A non-finite intermediate value ends the series.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let sma: f64 = values[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &value in &values[period..] {
        let ema = value * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// EMA aligned to the input: `None` for the first `period - 1` samples.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    align(values.len(), period.saturating_sub(1), calculate_ema(values, period))
}

/// Rolling SMA aligned to the input: `None` for the first `period - 1` samples.
pub fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let compact: Vec<f64> = values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect();
    align(values.len(), period - 1, compact)
}

/// EMA over a partially defined series.  The average starts at the first
/// defined sample; everything before it stays `None`.
pub fn ema_of_defined(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let Some(start) = values.iter().position(Option::is_some) else {
        return vec![None; values.len()];
    };

    let defined: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();
    align(
        values.len(),
        start + period.saturating_sub(1),
        calculate_ema(&defined, period),
    )
}

/// Place `compact` into a `len`-sized vector starting at `offset`.
pub(crate) fn align(len: usize, offset: usize, compact: Vec<f64>) -> Vec<Option<f64>> {
    let mut out = vec![None; len];
    for (slot, value) in out.iter_mut().skip(offset).zip(compact) {
        *slot = Some(value);
    }
    out
}
