/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Messages that reach the reporter, and the display collaborator.
//!
//! ```text
//! digital monitors ──SubsystemEvent──►  events      ─┐
//!                                                   ├─► reporter task ──► Reporter::render
//! analog samplers ──AggregateMessage──► aggregates ─┘     (owns SubsystemFlags)
//! ```
//!
//! Subsystem activity travels as messages.  The reporter folds the events
//! of one period into its own [`SubsystemFlags`], renders, and resets them;
//! no task writes to state another task reads.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::sensor::{SensorId, Subsystem};

// ── Messages ──────────────────────────────────────────────────────────────────

/// Mean of one full sample window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateMessage {
    pub sensor: SensorId,
    pub mean: f64,
    /// Scheduler clock reading when the window completed.
    pub produced_at: Duration,
}

/// A digital sensor triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemEvent {
    pub sensor: SensorId,
    pub subsystem: Subsystem,
    pub at: Duration,
}

// ── SubsystemFlags ────────────────────────────────────────────────────────────

/// Which subsystems saw activity in the current reporting period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubsystemFlags {
    pub motor: bool,
    pub braking: bool,
    pub life_support: bool,
}

impl SubsystemFlags {
    pub fn set(&mut self, subsystem: Subsystem) {
        match subsystem {
            Subsystem::Motor => self.motor = true,
            Subsystem::Braking => self.braking = true,
            Subsystem::LifeSupport => self.life_support = true,
        }
    }

    pub fn is_active(&self, subsystem: Subsystem) -> bool {
        match subsystem {
            Subsystem::Motor => self.motor,
            Subsystem::Braking => self.braking,
            Subsystem::LifeSupport => self.life_support,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ── DisplaySnapshot ───────────────────────────────────────────────────────────

/// Everything one render shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    /// Scheduler clock reading at render time.
    pub at: Duration,
    pub flags: SubsystemFlags,
    /// Last known mean per analog sensor.  A sensor is absent until its
    /// first window completes.
    pub averages: BTreeMap<SensorId, f64>,
    /// Aggregates received during this period.
    pub aggregates_received: usize,
    /// Subsystem events received during this period.
    pub events_received: usize,
}

impl DisplaySnapshot {
    pub fn average(&self, sensor: SensorId) -> Option<f64> {
        self.averages.get(&sensor).copied()
    }
}

/// Human-readable status word used by the display.
pub struct Activity(pub bool);

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "active" } else { "inactive" })
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

/// Display collaborator.  Called once per reporting period.
pub trait Reporter: Send {
    fn render(&mut self, snapshot: &DisplaySnapshot);
}

/// Any `FnMut(&DisplaySnapshot)` is a reporter.
impl<F> Reporter for F
where
    F: FnMut(&DisplaySnapshot) + Send,
{
    fn render(&mut self, snapshot: &DisplaySnapshot) {
        self(snapshot)
    }
}

/// Renders the display as `info!` lines.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn render(&mut self, snapshot: &DisplaySnapshot) {
        info!(at_ms = snapshot.at.as_millis() as u64, "subsystem status:");
        for subsystem in [Subsystem::Motor, Subsystem::Braking, Subsystem::LifeSupport] {
            info!(
                "  {subsystem}: {}",
                Activity(snapshot.flags.is_active(subsystem))
            );
        }
        for sensor in [SensorId::Speed, SensorId::Consumption] {
            match snapshot.average(sensor) {
                Some(mean) => info!("  average {sensor}: {mean:.2} {}", sensor.unit()),
                None => info!("  average {sensor}: n/a"),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn flags_set_and_reset() {
        let mut flags = SubsystemFlags::default();
        flags.set(Subsystem::Braking);
        assert!(flags.is_active(Subsystem::Braking));
        assert!(!flags.is_active(Subsystem::Motor));

        flags.set(Subsystem::Braking);
        flags.set(Subsystem::LifeSupport);
        assert_eq!(
            flags,
            SubsystemFlags {
                motor: false,
                braking: true,
                life_support: true
            }
        );

        flags.reset();
        assert_eq!(flags, SubsystemFlags::default());
    }

    #[test]
    fn activity_words() {
        assert_eq!(Activity(true).to_string(), "active");
        assert_eq!(Activity(false).to_string(), "inactive");
    }

    #[test]
    fn closures_are_reporters() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut reporter: Box<dyn Reporter> = Box::new(move |s: &DisplaySnapshot| {
            sink.lock().unwrap().push(s.at);
        });

        let snapshot = DisplaySnapshot {
            at: Duration::from_millis(1_000),
            flags: SubsystemFlags::default(),
            averages: BTreeMap::from([(SensorId::Speed, 49.5)]),
            aggregates_received: 1,
            events_received: 0,
        };
        reporter.render(&snapshot);
        LogReporter.render(&snapshot);

        assert_eq!(*seen.lock().unwrap(), vec![Duration::from_millis(1_000)]);
        assert_eq!(snapshot.average(SensorId::Speed), Some(49.5));
        assert_eq!(snapshot.average(SensorId::Consumption), None);
    }
}
