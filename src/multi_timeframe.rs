// =============================================================================
// Multi-Timeframe Analysis
// =============================================================================
//
// Runs a fixed indicator set per timeframe and folds the results into one
// report:
//
//   D1  (macro_bias) : RSI + MACD
//   H4  (tactical)   : RSI + Bollinger Bands + triple moving average
//   H1  (zone)       : RSI + Bollinger Bands + triple moving average
//   M5  (timing)     : RSI
//
// H4 / H1 optionally carry RSI variants, ATR and ADX (see
// `VolatilityParams::extended_indicators`).
//
// Every stage is optional.  A failed indicator is stored as a
// `IndicatorOutcome::Failed` next to its siblings; a timeframe whose input
// fails validation becomes a `TimeframeStage::Failed` without touching the
// others.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::IndicatorError;
use crate::indicators::result::{IndicatorKind, IndicatorOutcome, IndicatorResult};
use crate::indicators::{adx, atr, bollinger, macd, moving_average, rsi};
use crate::market_data::{validate, Series, SeriesInput};
use crate::signals::synthesizer::{OverallSignal, SignalSynthesizer};
use crate::signals::trend_bias::{classify_trend_momentum, TrendMomentum};
use crate::types::{Purpose, Timeframe};

// =============================================================================
// Types
// =============================================================================

/// Indicator outcomes computed for one timeframe.
#[derive(Debug, Clone, Serialize)]
pub struct TimeframeBundle {
    pub timeframe: Timeframe,
    pub purpose: Purpose,
    pub sample_count: usize,
    pub indicators: BTreeMap<IndicatorKind, IndicatorOutcome>,
}

impl TimeframeBundle {
    fn new(timeframe: Timeframe, sample_count: usize) -> Self {
        Self {
            timeframe,
            purpose: timeframe.purpose(),
            sample_count,
            indicators: BTreeMap::new(),
        }
    }

    /// Successful result for `kind`, if computed.
    pub fn result(&self, kind: IndicatorKind) -> Option<&IndicatorResult> {
        self.indicators.get(&kind).and_then(IndicatorOutcome::result)
    }

    fn insert(&mut self, kind: IndicatorKind, result: Result<IndicatorResult, IndicatorError>) {
        let outcome = IndicatorOutcome::from_result(kind, self.timeframe, result);
        self.insert_outcome(kind, outcome);
    }

    fn insert_outcome(&mut self, kind: IndicatorKind, outcome: IndicatorOutcome) {
        if let IndicatorOutcome::Failed { error, .. } = &outcome {
            warn!(
                timeframe = %self.timeframe,
                indicator = %kind,
                error = %error,
                "indicator failed"
            );
        }
        self.indicators.insert(kind, outcome);
    }
}

/// One timeframe slot of the report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimeframeStage {
    Analyzed(TimeframeBundle),
    Failed {
        timeframe: Timeframe,
        purpose: Purpose,
        error: IndicatorError,
    },
}

impl TimeframeStage {
    pub fn bundle(&self) -> Option<&TimeframeBundle> {
        match self {
            Self::Analyzed(b) => Some(b),
            Self::Failed { .. } => None,
        }
    }
}

/// Complete output of one multi-timeframe run for a pair.
#[derive(Debug, Clone, Serialize)]
pub struct MultiTimeframeReport {
    pub id: Uuid,
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub timeframes: BTreeMap<Timeframe, TimeframeStage>,
    pub overall_signal: OverallSignal,
}

impl MultiTimeframeReport {
    pub fn bundle(&self, timeframe: Timeframe) -> Option<&TimeframeBundle> {
        self.timeframes.get(&timeframe).and_then(TimeframeStage::bundle)
    }

    /// MACD x RSI composite on the daily MACD line and daily RSI.
    pub fn daily_trend_bias(&self) -> TrendMomentum {
        let daily = |kind| {
            self.bundle(Timeframe::D1)
                .and_then(|b| b.result(kind))
                .and_then(|r| r.current_value)
        };
        classify_trend_momentum(daily(IndicatorKind::Macd), daily(IndicatorKind::Rsi))
    }
}

// =============================================================================
// Stages
// =============================================================================

/// Compute the indicator set assigned to `series.timeframe()`.
pub fn analyze_timeframe(series: &Series, config: &EngineConfig) -> TimeframeBundle {
    let timeframe = series.timeframe();
    let mut bundle = TimeframeBundle::new(timeframe, series.len());

    bundle.insert(IndicatorKind::Rsi, rsi::calculate(series, &config.rsi));

    match timeframe {
        Timeframe::D1 => {
            bundle.insert_outcome(IndicatorKind::Macd, daily_macd(series, config));
        }
        Timeframe::H4 | Timeframe::H1 => {
            bundle.insert(
                IndicatorKind::BollingerBands,
                bollinger::calculate(series, &config.bollinger),
            );
            bundle.insert(
                IndicatorKind::MovingAverages,
                moving_average::calculate_triple(series, &config.moving_average),
            );

            if config.volatility.extended_indicators {
                for (kind, result) in rsi::rsi_variants(series, &config.rsi) {
                    bundle.insert(kind, result);
                }
                bundle.insert(IndicatorKind::Atr, atr::calculate(series, &config.volatility));
                bundle.insert(IndicatorKind::Adx, adx::calculate(series, &config.volatility));
            }
        }
        Timeframe::M5 => {}
    }

    bundle
}

/// Daily MACD.  A short daily history is reported with a hint on how much
/// data to fetch instead of a bare error.
fn daily_macd(series: &Series, config: &EngineConfig) -> IndicatorOutcome {
    let required = config.macd.min_samples();
    if series.len() < required {
        return IndicatorOutcome::Failed {
            indicator: IndicatorKind::Macd,
            timeframe: Timeframe::D1,
            error: IndicatorError::InsufficientData {
                required,
                got: series.len(),
            },
            recommendation: Some(format!(
                "re-run with at least {required} daily bars (3+ months of history)"
            )),
        };
    }
    IndicatorOutcome::from_result(
        IndicatorKind::Macd,
        Timeframe::D1,
        macd::calculate(series, &config.macd),
    )
}

// =============================================================================
// Orchestration
// =============================================================================

/// Analyse every provided series and synthesise the overall signal.
///
/// Timeframes not present in `series` are simply absent from the report.  If
/// two series share a timeframe the later one wins.
pub fn analyze(symbol: &str, series: &[Series], config: &EngineConfig) -> MultiTimeframeReport {
    let mut timeframes = BTreeMap::new();
    for s in series {
        let stage = TimeframeStage::Analyzed(analyze_timeframe(s, config));
        if timeframes.insert(s.timeframe(), stage).is_some() {
            warn!(symbol, timeframe = %s.timeframe(), "duplicate timeframe input, keeping the last");
        }
    }
    finish(symbol, timeframes, config)
}

/// Validate raw inputs first.  A validation failure is local to its
/// timeframe.
pub fn analyze_raw(
    symbol: &str,
    inputs: BTreeMap<Timeframe, SeriesInput>,
    config: &EngineConfig,
) -> MultiTimeframeReport {
    let timeframes = inputs
        .into_iter()
        .map(|(timeframe, input)| {
            let stage = match validate(timeframe, input) {
                Ok(series) => TimeframeStage::Analyzed(analyze_timeframe(&series, config)),
                Err(error) => {
                    warn!(symbol, timeframe = %timeframe, error = %error, "input rejected by validator");
                    TimeframeStage::Failed {
                        timeframe,
                        purpose: timeframe.purpose(),
                        error,
                    }
                }
            };
            (timeframe, stage)
        })
        .collect();
    finish(symbol, timeframes, config)
}

fn finish(
    symbol: &str,
    timeframes: BTreeMap<Timeframe, TimeframeStage>,
    config: &EngineConfig,
) -> MultiTimeframeReport {
    let synthesizer = SignalSynthesizer::new(config.synthesizer.clone());
    let overall_signal = synthesizer.synthesize(timeframes.values().filter_map(TimeframeStage::bundle));

    let failed = timeframes
        .values()
        .map(|stage| match stage {
            TimeframeStage::Analyzed(b) => b.indicators.values().filter(|o| o.error().is_some()).count(),
            TimeframeStage::Failed { .. } => 1,
        })
        .sum::<usize>();

    info!(
        symbol,
        timeframes = timeframes.len(),
        failed,
        direction = %overall_signal.direction,
        confidence = overall_signal.confidence,
        signals = overall_signal.signal_count,
        "multi-timeframe analysis complete"
    );

    MultiTimeframeReport {
        id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        generated_at: Utc::now(),
        timeframes,
        overall_signal,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::bar::test_support::{ascending, series_from_closes};
    use crate::types::Direction;

    /// Steadily accelerating rally: MACD stays above its signal line.
    fn accelerating(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 0.01 * (i * i) as f64).collect()
    }

    /// Sideways chop: RSI hovers around 50 and never reaches a level.
    fn choppy(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect()
    }

    /// 50 bars of accelerating decline, then a rally of +2 per bar.  With
    /// the 12/26/9 MACD the line crosses above its signal on the 4th rally
    /// bar, i.e. the last bar.
    fn daily_reversal() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..50).map(|i| 200.0 - 0.05 * (i * i) as f64).collect();
        let last = closes[49];
        closes.extend((1..=4).map(|j| last + 2.0 * j as f64));
        closes
    }

    #[test]
    fn short_daily_history_keeps_rsi_and_recommends_more_data() {
        let d1 = series_from_closes(Timeframe::D1, &ascending(20));
        let report = analyze("USD/JPY", &[d1], &EngineConfig::default());

        let bundle = report.bundle(Timeframe::D1).unwrap();
        assert_eq!(bundle.purpose, Purpose::MacroBias);
        assert!(bundle.result(IndicatorKind::Rsi).is_some());

        match &bundle.indicators[&IndicatorKind::Macd] {
            IndicatorOutcome::Failed {
                error,
                recommendation,
                ..
            } => {
                assert_eq!(*error, IndicatorError::InsufficientData { required: 36, got: 20 });
                assert!(recommendation.as_deref().unwrap().contains("36"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn insufficient_data_does_not_suppress_other_timeframes() {
        // 60 bars: enough for RSI and Bollinger, too few for the 200 MA.
        let h4 = series_from_closes(Timeframe::H4, &ascending(60));
        let m5 = series_from_closes(Timeframe::M5, &ascending(30));
        let report = analyze("EUR/USD", &[h4, m5], &EngineConfig::default());

        let h4 = report.bundle(Timeframe::H4).unwrap();
        assert!(h4.result(IndicatorKind::Rsi).is_some());
        assert!(h4.result(IndicatorKind::BollingerBands).is_some());
        assert_eq!(
            h4.indicators[&IndicatorKind::MovingAverages].error(),
            Some(&IndicatorError::InsufficientData { required: 210, got: 60 })
        );

        let m5 = report.bundle(Timeframe::M5).unwrap();
        assert_eq!(m5.indicators.len(), 1);
        assert_eq!(m5.result(IndicatorKind::Rsi).unwrap().derived_signal, "sell_timing");
        assert!(report.bundle(Timeframe::D1).is_none());
    }

    #[test]
    fn m5_timing_signal_feeds_overall_signal() {
        let m5 = series_from_closes(Timeframe::M5, &ascending(30));
        let report = analyze("GBP/USD", &[m5], &EngineConfig::default());
        assert_eq!(report.overall_signal.signals, vec!["M5_RSI_sell_timing".to_string()]);
        assert_eq!(report.overall_signal.direction, Direction::Bearish);
        assert_eq!(report.overall_signal.confidence, 20);
    }

    #[test]
    fn extended_indicators_attach_to_h1() {
        let mut config = EngineConfig::default();
        config.volatility.extended_indicators = true;
        let h1 = series_from_closes(Timeframe::H1, &ascending(60));
        let report = analyze("AUD/USD", &[h1], &config);

        let bundle = report.bundle(Timeframe::H1).unwrap();
        for kind in [
            IndicatorKind::RsiLong,
            IndicatorKind::RsiMedium,
            IndicatorKind::RsiShort,
            IndicatorKind::Atr,
            IndicatorKind::Adx,
        ] {
            assert!(bundle.indicators.contains_key(&kind), "missing {kind}");
        }
        assert!(bundle.result(IndicatorKind::Atr).is_some());
    }

    #[test]
    fn validator_failure_is_local_to_its_timeframe() {
        let mut inputs = BTreeMap::new();
        inputs.insert(
            Timeframe::H4,
            SeriesInput::Array {
                rows: vec![vec![serde_json::json!(1)]],
            },
        );
        let closes: Vec<serde_json::Value> = ascending(20).into_iter().map(serde_json::Value::from).collect();
        let ts: Vec<serde_json::Value> = (0..20).map(|i| serde_json::Value::from(1_700_000_000_000_i64 + i * 300_000)).collect();
        let mut columns = serde_json::Map::new();
        columns.insert("timestamp".into(), serde_json::Value::Array(ts));
        for name in ["Open", "High", "Low", "Close"] {
            columns.insert(name.into(), serde_json::Value::Array(closes.clone()));
        }
        inputs.insert(Timeframe::M5, SeriesInput::Columns { columns });

        let report = analyze_raw("USD/CHF", inputs, &EngineConfig::default());
        assert!(matches!(
            report.timeframes[&Timeframe::H4],
            TimeframeStage::Failed { error: IndicatorError::MalformedInput { .. }, .. }
        ));
        assert!(report.bundle(Timeframe::M5).unwrap().result(IndicatorKind::Rsi).is_some());
    }

    #[test]
    fn daily_golden_cross_reaches_overall_signal() {
        let series = [
            series_from_closes(Timeframe::D1, &daily_reversal()),
            series_from_closes(Timeframe::H4, &choppy(60)),
            series_from_closes(Timeframe::H1, &choppy(60)),
            series_from_closes(Timeframe::M5, &choppy(30)),
        ];
        let report = analyze("EUR/JPY", &series, &EngineConfig::default());

        let d1 = report.bundle(Timeframe::D1).unwrap();
        assert_eq!(d1.result(IndicatorKind::Macd).unwrap().derived_signal, "golden_cross");
        assert_eq!(d1.result(IndicatorKind::Rsi).unwrap().derived_signal, "neutral");

        let overall = &report.overall_signal;
        assert_eq!(overall.signals, vec!["D1_MACD_golden_cross".to_string()]);
        assert_eq!(overall.buy_signal_count, 1);
        assert_eq!(overall.sell_signal_count, 0);
        assert_eq!(overall.direction, Direction::Bullish);
        assert_eq!(overall.confidence, 20);

        // Deep below zero with RSI in the teens: oversold wins.
        assert_eq!(
            report.daily_trend_bias().band,
            crate::signals::trend_bias::MomentumBand::Oversold
        );

        // Same pair with only 30 daily bars: MACD carries a recommendation,
        // every other timeframe is still analysed.
        let mut short = series.clone();
        short[0] = series_from_closes(Timeframe::D1, &daily_reversal()[..30]);
        let report = analyze("EUR/JPY", &short, &EngineConfig::default());
        let recommendation = match &report.bundle(Timeframe::D1).unwrap().indicators[&IndicatorKind::Macd] {
            IndicatorOutcome::Failed { recommendation, .. } => recommendation.clone(),
            other => panic!("expected failure, got {other:?}"),
        };
        assert_eq!(
            recommendation.as_deref(),
            Some("re-run with at least 36 daily bars (3+ months of history)")
        );
        assert_eq!(report.timeframes.len(), 4);
        assert!(report.overall_signal.signals.is_empty());
        assert_eq!(report.overall_signal.direction, Direction::Neutral);
        assert_eq!(report.daily_trend_bias().band, crate::signals::trend_bias::MomentumBand::InsufficientData);
    }

    #[test]
    fn report_serialises_with_timeframe_keys() {
        let d1 = series_from_closes(Timeframe::D1, &accelerating(60));
        let report = analyze("USD/JPY", &[d1], &EngineConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["symbol"], "USD/JPY");
        assert_eq!(json["timeframes"]["D1"]["status"], "analyzed");
        assert_eq!(json["timeframes"]["D1"]["purpose"], "macro_bias");
        assert_eq!(json["timeframes"]["D1"]["indicators"]["MACD"]["status"], "computed");
        assert_eq!(json["overall_signal"]["direction"], "neutral");
    }

    #[test]
    fn daily_trend_bias_uses_macd_and_rsi() {
        let d1 = series_from_closes(Timeframe::D1, &accelerating(60));
        let report = analyze("USD/JPY", &[d1], &EngineConfig::default());
        // Steady rally: RSI pinned at 100 => overbought band.
        let bias = report.daily_trend_bias();
        assert_eq!(bias.band, crate::signals::trend_bias::MomentumBand::Overbought);

        let empty = analyze("USD/JPY", &[], &EngineConfig::default());
        assert_eq!(
            empty.daily_trend_bias().band,
            crate::signals::trend_bias::MomentumBand::InsufficientData
        );
    }
}
