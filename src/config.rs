// =============================================================================
// Engine Configuration: immutable indicator parameters with atomic save
// =============================================================================
//
// Every period, level and threshold used by the calculators lives here.  A
// single `EngineConfig` value is built once and passed by reference into each
// calculator, so the same value can be shared across threads without locking.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_rsi_period() -> usize {
    14
}

fn default_overbought() -> f64 {
    70.0
}

fn default_neutral_level() -> f64 {
    50.0
}

fn default_oversold() -> f64 {
    30.0
}

fn default_trailing_window() -> usize {
    5
}

fn default_rsi_variant_periods() -> [usize; 3] {
    [70, 50, 30]
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_macd_padding() -> usize {
    10
}

fn default_bb_period() -> usize {
    20
}

fn default_bb_deviation() -> f64 {
    2.0
}

fn default_bb_padding() -> usize {
    5
}

fn default_walk_tolerance() -> f64 {
    0.01
}

fn default_walk_ratio() -> f64 {
    0.6
}

fn default_ma_short() -> usize {
    20
}

fn default_ma_medium() -> usize {
    50
}

fn default_ma_long() -> usize {
    200
}

fn default_ma_padding() -> usize {
    10
}

fn default_slope_threshold() -> f64 {
    0.001
}

fn default_wilder_period() -> usize {
    14
}

fn default_confidence_per_signal() -> u32 {
    20
}

fn default_max_confidence() -> u32 {
    100
}

// =============================================================================
// RsiParams
// =============================================================================

/// RSI lookback, fixed levels and divergence window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsiParams {
    #[serde(default = "default_rsi_period")]
    pub period: usize,

    /// Value at or above which the oscillator is overbought.
    #[serde(default = "default_overbought")]
    pub overbought: f64,

    #[serde(default = "default_neutral_level")]
    pub neutral: f64,

    /// Value at or below which the oscillator is oversold.
    #[serde(default = "default_oversold")]
    pub oversold: f64,

    /// Trailing samples compared by the divergence detector.
    #[serde(default = "default_trailing_window")]
    pub divergence_window: usize,

    /// Long / medium / short lookbacks for the RSI variants.
    #[serde(default = "default_rsi_variant_periods")]
    pub variant_periods: [usize; 3],
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: default_rsi_period(),
            overbought: default_overbought(),
            neutral: default_neutral_level(),
            oversold: default_oversold(),
            divergence_window: default_trailing_window(),
            variant_periods: default_rsi_variant_periods(),
        }
    }
}

// =============================================================================
// MacdParams
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacdParams {
    #[serde(default = "default_macd_fast")]
    pub fast: usize,

    #[serde(default = "default_macd_slow")]
    pub slow: usize,

    #[serde(default = "default_macd_signal")]
    pub signal: usize,

    /// Extra bars required on top of `max(slow, signal)`.
    #[serde(default = "default_macd_padding")]
    pub warmup_padding: usize,
}

impl MacdParams {
    pub fn min_samples(&self) -> usize {
        self.slow.max(self.signal) + self.warmup_padding
    }
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: default_macd_fast(),
            slow: default_macd_slow(),
            signal: default_macd_signal(),
            warmup_padding: default_macd_padding(),
        }
    }
}

// =============================================================================
// BollingerParams
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerParams {
    #[serde(default = "default_bb_period")]
    pub period: usize,

    /// Standard-deviation multiplier for the envelope.
    #[serde(default = "default_bb_deviation")]
    pub deviation: f64,

    #[serde(default = "default_bb_padding")]
    pub warmup_padding: usize,

    /// Trailing bars inspected for a band walk.
    #[serde(default = "default_trailing_window")]
    pub walk_window: usize,

    /// Fractional distance from a band that still counts as a touch.
    #[serde(default = "default_walk_tolerance")]
    pub walk_tolerance: f64,

    /// Share of the window that must touch for a walk.
    #[serde(default = "default_walk_ratio")]
    pub walk_ratio: f64,
}

impl BollingerParams {
    pub fn min_samples(&self) -> usize {
        self.period + self.warmup_padding
    }
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: default_bb_period(),
            deviation: default_bb_deviation(),
            warmup_padding: default_bb_padding(),
            walk_window: default_trailing_window(),
            walk_tolerance: default_walk_tolerance(),
            walk_ratio: default_walk_ratio(),
        }
    }
}

// =============================================================================
// MovingAverageParams
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverageParams {
    #[serde(default = "default_ma_short")]
    pub short: usize,

    #[serde(default = "default_ma_medium")]
    pub medium: usize,

    #[serde(default = "default_ma_long")]
    pub long: usize,

    /// Extra bars required on top of the (longest) period.
    #[serde(default = "default_ma_padding")]
    pub warmup_padding: usize,

    #[serde(default = "default_trailing_window")]
    pub slope_window: usize,

    /// Linear-fit slope magnitude below which an average is `flat`.
    #[serde(default = "default_slope_threshold")]
    pub slope_threshold: f64,
}

impl Default for MovingAverageParams {
    fn default() -> Self {
        Self {
            short: default_ma_short(),
            medium: default_ma_medium(),
            long: default_ma_long(),
            warmup_padding: default_ma_padding(),
            slope_window: default_trailing_window(),
            slope_threshold: default_slope_threshold(),
        }
    }
}

// =============================================================================
// VolatilityParams
// =============================================================================

/// ATR / ADX settings and the switch for the extended timeframe bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityParams {
    #[serde(default = "default_wilder_period")]
    pub atr_period: usize,

    #[serde(default = "default_wilder_period")]
    pub adx_period: usize,

    /// Attach RSI variants, ATR and ADX to the H4 / H1 bundles.
    #[serde(default)]
    pub extended_indicators: bool,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            atr_period: default_wilder_period(),
            adx_period: default_wilder_period(),
            extended_indicators: false,
        }
    }
}

// =============================================================================
// SynthesizerParams
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerParams {
    /// Confidence points awarded per net buy/sell signal.
    #[serde(default = "default_confidence_per_signal")]
    pub confidence_per_signal: u32,

    #[serde(default = "default_max_confidence")]
    pub max_confidence: u32,
}

impl Default for SynthesizerParams {
    fn default() -> Self {
        Self {
            confidence_per_signal: default_confidence_per_signal(),
            max_confidence: default_max_confidence(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the signal engine.
///
/// Every section has a serde default so that older JSON files missing new
/// fields will still deserialise correctly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub rsi: RsiParams,

    #[serde(default)]
    pub macd: MacdParams,

    #[serde(default)]
    pub bollinger: BollingerParams,

    #[serde(default)]
    pub moving_average: MovingAverageParams,

    #[serde(default)]
    pub volatility: VolatilityParams,

    #[serde(default)]
    pub synthesizer: SynthesizerParams,
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            rsi_period = config.rsi.period,
            macd = format!("{},{},{}", config.macd.fast, config.macd.slow, config.macd.signal),
            extended = config.volatility.extended_indicators,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write (write to
    /// `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.rsi.period, 14);
        assert!((cfg.rsi.overbought - 70.0).abs() < f64::EPSILON);
        assert!((cfg.rsi.oversold - 30.0).abs() < f64::EPSILON);
        assert_eq!(cfg.rsi.variant_periods, [70, 50, 30]);
        assert_eq!(cfg.macd.min_samples(), 36);
        assert_eq!(cfg.bollinger.min_samples(), 25);
        assert_eq!(cfg.moving_average.long, 200);
        assert!(!cfg.volatility.extended_indicators);
        assert_eq!(cfg.synthesizer.confidence_per_signal, 20);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.macd.fast, 12);
        assert_eq!(cfg.macd.slow, 26);
        assert_eq!(cfg.macd.signal, 9);
        assert_eq!(cfg.bollinger.walk_window, 5);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "rsi": { "period": 9 }, "volatility": { "extended_indicators": true } }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.rsi.period, 9);
        assert!((cfg.rsi.overbought - 70.0).abs() < f64::EPSILON);
        assert!(cfg.volatility.extended_indicators);
        assert_eq!(cfg.volatility.atr_period, 14);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("mtf-engine-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine_config.json");

        let mut cfg = EngineConfig::default();
        cfg.bollinger.deviation = 2.5;
        cfg.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert!((loaded.bollinger.deviation - 2.5).abs() < f64::EPSILON);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(EngineConfig::load("/nonexistent/engine_config.json").is_err());
    }
}
