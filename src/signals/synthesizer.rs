// =============================================================================
// Signal Synthesizer: counts buy / sell leaning events across timeframes
// =============================================================================
//
// Tags are collected from three indicators only:
//   {tf}_RSI_{signal}        RSI signal other than neutral / no_signal
//   {tf}_MACD_{cross}        MACD cross other than no_cross / no_signal
//   {tf}_MA_{pair}_{cross}   moving-average pair cross other than no_cross
//
// A tag leans buy if it contains "buy" or "golden", sell if it contains
// "sell" or "dead".  Direction follows the larger count (tie => neutral) and
//   confidence = min(|buy - sell| * per_signal, max)

use serde::{Deserialize, Serialize};

use crate::config::SynthesizerParams;
use crate::indicators::result::{IndicatorDetails, IndicatorKind};
use crate::multi_timeframe::TimeframeBundle;
use crate::types::Direction;

/// Aggregated direction over every analysed timeframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallSignal {
    pub direction: Direction,
    /// 0-100.
    pub confidence: u32,
    pub signal_count: usize,
    pub buy_signal_count: usize,
    pub sell_signal_count: usize,
    /// Contributing tags, highest timeframe first.
    pub signals: Vec<String>,
}

/// Stateless aggregator holding only its scoring parameters.
#[derive(Debug, Clone, Default)]
pub struct SignalSynthesizer {
    params: SynthesizerParams,
}

impl SignalSynthesizer {
    pub fn new(params: SynthesizerParams) -> Self {
        Self { params }
    }

    /// Collect tags from every bundle and score them.
    pub fn synthesize<'a>(&self, bundles: impl IntoIterator<Item = &'a TimeframeBundle>) -> OverallSignal {
        let tags = bundles.into_iter().flat_map(signal_tags).collect();
        self.score_tags(tags)
    }

    /// Score an already collected tag list.
    pub fn score_tags(&self, tags: Vec<String>) -> OverallSignal {
        let buy = tags.iter().filter(|t| leans_buy(t)).count();
        let sell = tags.iter().filter(|t| leans_sell(t)).count();

        let direction = if buy > sell {
            Direction::Bullish
        } else if sell > buy {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let net = buy.abs_diff(sell) as u64;
        let confidence = (net * u64::from(self.params.confidence_per_signal))
            .min(u64::from(self.params.max_confidence)) as u32;

        OverallSignal {
            direction,
            confidence,
            signal_count: tags.len(),
            buy_signal_count: buy,
            sell_signal_count: sell,
            signals: tags,
        }
    }
}

/// Tags contributed by one timeframe bundle.
pub fn signal_tags(bundle: &TimeframeBundle) -> Vec<String> {
    let tf = bundle.timeframe;
    let mut tags = Vec::new();

    if let Some(rsi) = bundle.result(IndicatorKind::Rsi) {
        if !matches!(rsi.derived_signal, "neutral" | "no_signal") {
            tags.push(format!("{tf}_RSI_{}", rsi.derived_signal));
        }
    }

    if let Some(macd) = bundle.result(IndicatorKind::Macd) {
        if !matches!(macd.derived_signal, "no_cross" | "no_signal") {
            tags.push(format!("{tf}_MACD_{}", macd.derived_signal));
        }
    }

    if let Some(ma) = bundle.result(IndicatorKind::MovingAverages) {
        if let IndicatorDetails::TripleMovingAverage { crosses, .. } = &ma.details {
            for (pair, cross) in crosses {
                if cross.is_event() {
                    tags.push(format!("{tf}_MA_{pair}_{cross}"));
                }
            }
        }
    }

    tags
}

fn leans_buy(tag: &str) -> bool {
    tag.contains("buy") || tag.contains("golden")
}

fn leans_sell(tag: &str) -> bool {
    tag.contains("sell") || tag.contains("dead")
}
