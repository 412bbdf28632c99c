// =============================================================================
// Multi-Timeframe Signal Engine
// =============================================================================
//
// Technical-indicator computation over D1 / H4 / H1 / M5 bar series and
// synthesis of one directional signal per currency pair.  Every calculator is
// a pure function of `(&Series, &config)`; the only shared state is the
// immutable `EngineConfig`.

pub mod config;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod multi_timeframe;
pub mod signals;
pub mod types;

pub use config::EngineConfig;
pub use error::IndicatorError;
pub use multi_timeframe::{analyze, analyze_raw, MultiTimeframeReport};
