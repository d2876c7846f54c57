/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Major and minor frame of a periodic task set.
//!
//! The **major frame** (hyperperiod) is the LCM of all task periods: after
//! that long the activation pattern of a cyclic executive repeats exactly.
//! The **minor frame** is the GCD: the coarsest tick that still lands on
//! every release.
//!
//! | Failure | Result |
//! |---|---|
//! | no non-zero period | `Err(NoValidPeriods)` |
//! | LCM overflows `u64` | `Err(Overflow)` |
//! | LCM above the limit | `Err(TooLarge)`, the caller decides whether that matters |

pub mod math;

use std::fmt;

use tracing::debug;

use math::{gcd_of_slice, lcm_of_slice};

/// Default upper limit on the major frame: one hour in ms.
pub const DEFAULT_FRAME_LIMIT_MS: u64 = 3_600_000;

// ── Error type ────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
pub enum HyperperiodError {
    /// The period slice was empty, or every period was zero.
    NoValidPeriods,

    /// LCM calculation overflowed `u64`.
    Overflow { a: u64, b: u64 },

    /// The major frame exceeds the configured limit.
    TooLarge { value_ms: u64, limit_ms: u64 },
}

impl fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => {
                write!(f, "no tasks with a valid (non-zero) period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value_ms, limit_ms } => write!(
                f,
                "major frame {value_ms}ms ({:.1}s) exceeds limit {limit_ms}ms ({:.1}s)",
                *value_ms as f64 / 1_000.0,
                *limit_ms as f64 / 1_000.0
            ),
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── MajorFrame ────────────────────────────────────────────────────────────────

/// Frame structure of one task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorFrame {
    /// LCM of all periods, in ms.
    pub major_ms: u64,
    /// GCD of all periods, in ms.
    pub minor_ms: u64,
    /// Distinct non-zero periods, sorted ascending.
    pub unique_periods: Vec<u64>,
}

impl MajorFrame {
    /// Frame of `periods_ms` with the default one-hour limit.
    pub fn from_periods(periods_ms: &[u64]) -> Result<Self, HyperperiodError> {
        Self::from_periods_with_limit(periods_ms, DEFAULT_FRAME_LIMIT_MS)
    }

    /// Frame of `periods_ms`, rejecting a major frame above `limit_ms`.
    ///
    /// Zero periods are ignored.
    pub fn from_periods_with_limit(
        periods_ms: &[u64],
        limit_ms: u64,
    ) -> Result<Self, HyperperiodError> {
        let mut unique_periods: Vec<u64> =
            periods_ms.iter().copied().filter(|&p| p > 0).collect();
        unique_periods.sort_unstable();
        unique_periods.dedup();

        if unique_periods.is_empty() {
            return Err(HyperperiodError::NoValidPeriods);
        }

        let major_ms = lcm_of_slice(&unique_periods)?;
        if major_ms > limit_ms {
            return Err(HyperperiodError::TooLarge {
                value_ms: major_ms,
                limit_ms,
            });
        }
        let minor_ms = gcd_of_slice(&unique_periods);

        debug!(major_ms, minor_ms, "computed task set frame");

        Ok(Self {
            major_ms,
            minor_ms,
            unique_periods,
        })
    }

    /// Number of minor frames in one major frame.
    pub fn minor_frames(&self) -> u64 {
        if self.minor_ms == 0 {
            0
        } else {
            self.major_ms / self.minor_ms
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_task_set_frame() {
        let frame = MajorFrame::from_periods(&[15, 20, 100, 100, 1_000, 100, 100, 1_000]).unwrap();
        assert_eq!(frame.major_ms, 3_000);
        assert_eq!(frame.minor_ms, 5);
        assert_eq!(frame.unique_periods, vec![15, 20, 100, 1_000]);
        assert_eq!(frame.minor_frames(), 600);
    }

    #[test]
    fn single_period_is_its_own_frame() {
        let frame = MajorFrame::from_periods(&[40]).unwrap();
        assert_eq!(frame.major_ms, 40);
        assert_eq!(frame.minor_ms, 40);
        assert_eq!(frame.minor_frames(), 1);
    }

    #[test]
    fn zero_periods_are_ignored() {
        let frame = MajorFrame::from_periods(&[0, 10, 0, 4]).unwrap();
        assert_eq!(frame.major_ms, 20);
        assert_eq!(frame.unique_periods, vec![4, 10]);
    }

    #[test]
    fn empty_or_all_zero_is_an_error() {
        assert_eq!(
            MajorFrame::from_periods(&[]),
            Err(HyperperiodError::NoValidPeriods)
        );
        assert_eq!(
            MajorFrame::from_periods(&[0, 0]),
            Err(HyperperiodError::NoValidPeriods)
        );
    }

    #[test]
    fn frame_above_limit_is_too_large() {
        // 1 s and 7 s → 7 s, limit 5 s
        let result = MajorFrame::from_periods_with_limit(&[1_000, 7_000], 5_000);
        assert!(matches!(
            result,
            Err(HyperperiodError::TooLarge { value_ms: 7_000, .. })
        ));
    }

    #[test]
    fn frame_exactly_at_limit_is_accepted() {
        let frame = MajorFrame::from_periods_with_limit(&[5_000], 5_000).unwrap();
        assert_eq!(frame.major_ms, 5_000);
    }

    #[test]
    fn too_large_message_is_human_readable() {
        let e = HyperperiodError::TooLarge {
            value_ms: 7_000,
            limit_ms: 5_000,
        };
        assert_eq!(
            e.to_string(),
            "major frame 7000ms (7.0s) exceeds limit 5000ms (5.0s)"
        );
    }
}
