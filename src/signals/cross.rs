// =============================================================================
// Cross Detection: golden / dead crosses between a fast and a slow line
// =============================================================================
//
//   golden_cross : prev_fast <= prev_slow  AND  fast > slow
//   dead_cross   : prev_fast >= prev_slow  AND  fast < slow
//   no_cross     : anything else
//   no_signal    : any of the four values undefined

use serde::Serialize;

/// Crossing event between two lines on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossEvent {
    GoldenCross,
    DeadCross,
    NoCross,
    NoSignal,
}

impl CrossEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GoldenCross => "golden_cross",
            Self::DeadCross => "dead_cross",
            Self::NoCross => "no_cross",
            Self::NoSignal => "no_signal",
        }
    }

    /// `true` for golden / dead crosses.
    pub fn is_event(self) -> bool {
        matches!(self, Self::GoldenCross | Self::DeadCross)
    }
}

impl std::fmt::Display for CrossEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the crossing of `fast` over `slow` between the previous and the
/// current bar.
pub fn detect_cross(
    fast: Option<f64>,
    slow: Option<f64>,
    prev_fast: Option<f64>,
    prev_slow: Option<f64>,
) -> CrossEvent {
    let (Some(fast), Some(slow), Some(prev_fast), Some(prev_slow)) = (fast, slow, prev_fast, prev_slow)
    else {
        return CrossEvent::NoSignal;
    };

    if prev_fast <= prev_slow && fast > slow {
        CrossEvent::GoldenCross
    } else if prev_fast >= prev_slow && fast < slow {
        CrossEvent::DeadCross
    } else {
        CrossEvent::NoCross
    }
}

/// Walk two aligned series and report the cross event at every index.
///
/// Index 0 has no predecessor and is always `NoSignal`.
pub fn cross_events(fast: &[Option<f64>], slow: &[Option<f64>]) -> Vec<CrossEvent> {
    let n = fast.len().min(slow.len());
    (0..n)
        .map(|i| {
            if i == 0 {
                CrossEvent::NoSignal
            } else {
                detect_cross(fast[i], slow[i], fast[i - 1], slow[i - 1])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_cross_from_touching() {
        assert_eq!(
            detect_cross(Some(1.1), Some(1.0), Some(1.0), Some(1.0)),
            CrossEvent::GoldenCross
        );
    }

    #[test]
    fn dead_cross_from_above() {
        assert_eq!(
            detect_cross(Some(0.9), Some(1.0), Some(1.2), Some(1.0)),
            CrossEvent::DeadCross
        );
    }

    #[test]
    fn staying_above_is_no_cross() {
        assert_eq!(
            detect_cross(Some(2.0), Some(1.0), Some(1.5), Some(1.0)),
            CrossEvent::NoCross
        );
    }

    #[test]
    fn equal_now_is_no_cross() {
        assert_eq!(
            detect_cross(Some(1.0), Some(1.0), Some(0.5), Some(1.0)),
            CrossEvent::NoCross
        );
    }

    #[test]
    fn undefined_value_is_no_signal() {
        assert_eq!(detect_cross(None, Some(1.0), Some(1.0), Some(1.0)), CrossEvent::NoSignal);
        assert_eq!(detect_cross(Some(1.0), Some(1.0), Some(1.0), None), CrossEvent::NoSignal);
    }

    #[test]
    fn monotonic_rise_crosses_exactly_once() {
        // Fast line rises through a flat slow line and keeps rising.
        let fast: Vec<Option<f64>> = [-3.0, -2.0, -1.0, 1.0, 2.0, 3.0, 4.0].iter().map(|&v| Some(v)).collect();
        let slow = vec![Some(0.0); fast.len()];
        let events = cross_events(&fast, &slow);

        let golden: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == CrossEvent::GoldenCross)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(golden, vec![3]);
        assert!(events[4..].iter().all(|e| *e == CrossEvent::NoCross));
        assert_eq!(events[0], CrossEvent::NoSignal);
    }
}
