// =============================================================================
// Signals Module
// =============================================================================
//
// Event detectors and aggregation on top of the indicator outputs:
// - Cross detection between two aligned series
// - Price / indicator divergence over a short trailing window
// - MACD x RSI trend bias composite
// - Multi-timeframe signal synthesis

pub mod cross;
pub mod divergence;
pub mod synthesizer;
pub mod trend_bias;

pub use cross::CrossEvent;
pub use divergence::DivergenceEvent;
pub use synthesizer::{OverallSignal, SignalSynthesizer};
pub use trend_bias::{classify_trend_momentum, MomentumBand, TrendMomentum};
