// =============================================================================
// Trend / Momentum Composite: MACD line x RSI bias classifier
// =============================================================================
//
// Maps a (macd_line, rsi) pair onto one of eight bands.  Evaluated
// top-to-bottom; first match wins:
//
//   1. OVERBOUGHT        : RSI > 70                         (80, SHORT)
//   2. OVERSOLD          : RSI < 30                         (80, LONG)
//   3. STRONG_UPTREND    : MACD > 0.1  AND RSI > 60         (90, LONG)
//   4. WEAK_UPTREND      : MACD > 0    AND RSI > 50         (70, LONG)
//   5. RANGE             : |MACD| <= 0.1 AND 45 <= RSI <= 55 (50, NEUTRAL)
//   6. STRONG_DOWNTREND  : MACD < -0.1 AND RSI < 40         (90, SHORT)
//   7. WEAK_DOWNTREND    : MACD < 0    AND RSI < 45         (70, SHORT)
//   8. UNCLEAR           : anything else                    (30, NEUTRAL)
//
// The strong downtrend band is tested ahead of the weak one, mirroring the
// uptrend side; every strong-downtrend input also satisfies the weak rule.
//
// Either input undefined => INSUFFICIENT_DATA (0, NEUTRAL).

use serde::Serialize;
use tracing::trace;

use crate::types::Bias;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumBand {
    Overbought,
    Oversold,
    StrongUptrend,
    WeakUptrend,
    Range,
    StrongDowntrend,
    WeakDowntrend,
    Unclear,
    InsufficientData,
}

impl MomentumBand {
    /// Confidence (0-100) and recommended bias for this band.
    fn profile(self) -> (u32, Bias) {
        match self {
            Self::Overbought => (80, Bias::Short),
            Self::Oversold => (80, Bias::Long),
            Self::StrongUptrend => (90, Bias::Long),
            Self::WeakUptrend => (70, Bias::Long),
            Self::Range => (50, Bias::Neutral),
            Self::StrongDowntrend => (90, Bias::Short),
            Self::WeakDowntrend => (70, Bias::Short),
            Self::Unclear => (30, Bias::Neutral),
            Self::InsufficientData => (0, Bias::Neutral),
        }
    }

    /// Short trading note attached to the band.
    pub fn guidance(self) -> &'static str {
        match self {
            Self::Overbought => "RSI overheated on the upside; take profit or fade short-term",
            Self::Oversold => "RSI overheated on the downside; take profit or fade short-term",
            Self::StrongUptrend => "MACD well above zero with RSI over 60; trend-following longs",
            Self::WeakUptrend => "MACD slightly positive with RSI over 50; small size, follow carefully",
            Self::Range => "MACD within 0.1 of zero and RSI 45-55; no clear direction",
            Self::StrongDowntrend => "MACD well below zero with RSI under 40; trend-following shorts",
            Self::WeakDowntrend => "MACD slightly negative with RSI under 45; prepare to sell rallies",
            Self::Unclear => "MACD and RSI disagree",
            Self::InsufficientData => "MACD or RSI unavailable",
        }
    }
}

impl std::fmt::Display for MomentumBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::StrongUptrend => write!(f, "STRONG_UPTREND"),
            Self::WeakUptrend => write!(f, "WEAK_UPTREND"),
            Self::Range => write!(f, "RANGE"),
            Self::StrongDowntrend => write!(f, "STRONG_DOWNTREND"),
            Self::WeakDowntrend => write!(f, "WEAK_DOWNTREND"),
            Self::Unclear => write!(f, "UNCLEAR"),
            Self::InsufficientData => write!(f, "INSUFFICIENT_DATA"),
        }
    }
}

/// Classified band plus the inputs it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendMomentum {
    pub band: MomentumBand,
    pub confidence: u32,
    pub bias: Bias,
    pub macd_line: Option<f64>,
    pub rsi: Option<f64>,
}

/// Classify a MACD line / RSI pair.
pub fn classify_trend_momentum(macd_line: Option<f64>, rsi: Option<f64>) -> TrendMomentum {
    let band = match (macd_line, rsi) {
        (Some(macd), Some(rsi)) => classify(macd, rsi),
        _ => MomentumBand::InsufficientData,
    };
    let (confidence, bias) = band.profile();

    TrendMomentum {
        band,
        confidence,
        bias,
        macd_line,
        rsi,
    }
}

fn classify(macd: f64, rsi: f64) -> MomentumBand {
    if rsi > 70.0 {
        return MomentumBand::Overbought;
    }
    if rsi < 30.0 {
        return MomentumBand::Oversold;
    }
    if macd > 0.1 && rsi > 60.0 {
        return MomentumBand::StrongUptrend;
    }
    if macd > 0.0 && rsi > 50.0 {
        return MomentumBand::WeakUptrend;
    }
    if macd.abs() <= 0.1 && (45.0..=55.0).contains(&rsi) {
        return MomentumBand::Range;
    }
    if macd < -0.1 && rsi < 40.0 {
        return MomentumBand::StrongDowntrend;
    }
    if macd < 0.0 && rsi < 45.0 {
        return MomentumBand::WeakDowntrend;
    }

    trace!(
        macd = format!("{:.4}", macd),
        rsi = format!("{:.2}", rsi),
        "Trend bias: no band matched, UNCLEAR"
    );
    MomentumBand::Unclear
}
