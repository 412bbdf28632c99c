// =============================================================================
// Shared types used across the multi-timeframe signal engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Bar aggregation granularity handled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    D1,
    H4,
    H1,
    M5,
}

impl Timeframe {
    /// All timeframes in orchestration order (highest first).
    pub const ALL: [Timeframe; 4] = [Self::D1, Self::H4, Self::H1, Self::M5];

    /// The analytical purpose this timeframe serves in a multi-timeframe run.
    pub fn purpose(self) -> Purpose {
        match self {
            Self::D1 => Purpose::MacroBias,
            Self::H4 => Purpose::Tactical,
            Self::H1 => Purpose::Zone,
            Self::M5 => Purpose::Timing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::D1 => "D1",
            Self::H4 => "H4",
            Self::H1 => "H1",
            Self::M5 => "M5",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D1" | "1D" => Ok(Self::D1),
            "H4" | "4H" => Ok(Self::H4),
            "H1" | "1H" => Ok(Self::H1),
            "M5" | "5M" => Ok(Self::M5),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

/// Declared analytical role of a timeframe stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    MacroBias,
    Tactical,
    Zone,
    Timing,
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MacroBias => write!(f, "macro_bias"),
            Self::Tactical => write!(f, "tactical"),
            Self::Zone => write!(f, "zone"),
            Self::Timing => write!(f, "timing"),
        }
    }
}

/// Overall market direction produced by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Position bias recommended by the trend/momentum classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Long,
    Short,
    Neutral,
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}
