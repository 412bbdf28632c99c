// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Indicator calculators over a validated `Series`.  The numeric kernels are
// pure functions returning aligned `Vec<Option<f64>>` series (one slot per
// input bar, `None` inside the warm-up window).  The `calculate` entry points
// wrap those kernels into an `IndicatorResult` and fail with a typed
// `IndicatorError` instead of panicking.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod moving_average;
pub mod result;
pub mod rsi;

pub use result::{IndicatorDetails, IndicatorKind, IndicatorOutcome, IndicatorResult};

/// Latest and second-to-latest slots of an aligned series.
pub fn current_previous(series: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    match series {
        [] => (None, None),
        [only] => (*only, None),
        [.., prev, cur] => (*cur, *prev),
    }
}
