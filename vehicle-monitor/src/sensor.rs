/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Sensor identities and the sample source collaborator.
//!
//! ```text
//! SampleSource ──read(SensorId)──►  SensorReading  ──►  sampling task
//!   (simulated)                     Digital(bool) | Analog(f64)
//! ```
//!
//! A [`SampleSource`] is **total**: `read` always returns a value and never
//! blocks.  A sensor that cannot be read is reported as `Digital(false)` /
//! `Analog(0.0)` by the source itself, so sampling tasks have no error path
//! for sensor I/O.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

// ── SensorId ──────────────────────────────────────────────────────────────────

/// Every sensor the monitor knows about.
///
/// Used as the tag on sampling tasks and on every message that crosses a
/// channel.  Deserialises from the snake_case names used in the YAML
/// configuration (`injection`, `abs`, `seatbelt`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    /// Electronic fuel injection.
    Injection,
    /// Engine temperature over limit.
    Temperature,
    /// Anti-lock braking system.
    Abs,
    Airbag,
    Seatbelt,
    /// Vehicle speed in km/h.
    Speed,
    /// Fuel consumption in L/100km.
    Consumption,
}

impl SensorId {
    /// All sensors, in the order the default workload registers them.
    pub const ALL: [SensorId; 7] = [
        SensorId::Injection,
        SensorId::Temperature,
        SensorId::Abs,
        SensorId::Airbag,
        SensorId::Seatbelt,
        SensorId::Speed,
        SensorId::Consumption,
    ];

    /// Stable lower-case name, matching the configuration keys.
    pub fn name(self) -> &'static str {
        match self {
            SensorId::Injection => "injection",
            SensorId::Temperature => "temperature",
            SensorId::Abs => "abs",
            SensorId::Airbag => "airbag",
            SensorId::Seatbelt => "seatbelt",
            SensorId::Speed => "speed",
            SensorId::Consumption => "consumption",
        }
    }

    /// Digital sensors report on/off; analog sensors report a magnitude that
    /// is averaged over a sample window.
    pub fn kind(self) -> SensorKind {
        match self {
            SensorId::Speed | SensorId::Consumption => SensorKind::Analog,
            _ => SensorKind::Digital,
        }
    }

    /// Subsystem a digital sensor belongs to.  `None` for analog sensors.
    pub fn subsystem(self) -> Option<Subsystem> {
        match self {
            SensorId::Injection | SensorId::Temperature => Some(Subsystem::Motor),
            SensorId::Abs => Some(Subsystem::Braking),
            SensorId::Airbag | SensorId::Seatbelt => Some(Subsystem::LifeSupport),
            SensorId::Speed | SensorId::Consumption => None,
        }
    }

    /// Display unit for analog sensors (empty for digital ones).
    pub fn unit(self) -> &'static str {
        match self {
            SensorId::Speed => "km/h",
            SensorId::Consumption => "L/100km",
            _ => "",
        }
    }

    /// Upper (exclusive) bound of the simulated analog range.
    fn simulated_range(self) -> u32 {
        match self {
            SensorId::Speed => 100,
            SensorId::Consumption => 15,
            _ => 1,
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of the value a sensor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Digital,
    Analog,
}

/// Vehicle subsystem whose activity is shown on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subsystem {
    /// Injection and engine temperature.
    Motor,
    /// ABS.
    Braking,
    /// Airbag and seatbelt.
    LifeSupport,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Motor => f.write_str("motor"),
            Subsystem::Braking => f.write_str("braking"),
            Subsystem::LifeSupport => f.write_str("life_support"),
        }
    }
}

// ── Readings ──────────────────────────────────────────────────────────────────

/// One value read from a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    /// Digital input level (`true` = triggered).
    Digital(bool),
    /// Analog magnitude in the sensor's unit.
    Analog(f64),
}

impl SensorReading {
    /// `true` for a triggered digital input.  Analog readings are never
    /// "triggered".
    pub fn is_triggered(&self) -> bool {
        matches!(self, SensorReading::Digital(true))
    }

    /// Magnitude of an analog reading; digital readings map to `1.0`/`0.0`.
    pub fn value(&self) -> f64 {
        match *self {
            SensorReading::Digital(level) => {
                if level {
                    1.0
                } else {
                    0.0
                }
            }
            SensorReading::Analog(v) => v,
        }
    }
}

// ── SampleSource ──────────────────────────────────────────────────────────────

/// Supplies one reading per poll.
///
/// Implementations must be non-blocking and total.  Sampling tasks own their
/// source, so `Send` is enough and `Sync` is not required.
pub trait SampleSource: Send {
    fn read(&mut self, sensor: SensorId) -> SensorReading;
}

/// Pseudo-random sensor stub.
///
/// Digital sensors trigger with `trigger_probability`; analog sensors return
/// integer-valued samples in `[0, 100)` km/h (speed) and `[0, 15)` L/100km
/// (consumption).
#[derive(Debug)]
pub struct SimulatedSource {
    rng: StdRng,
    trigger_probability: f64,
}

impl SimulatedSource {
    /// Create a source with a fixed seed so runs are reproducible.
    ///
    /// `trigger_probability` is clamped into `[0.0, 1.0]`; `NaN` means never.
    pub fn new(seed: u64, trigger_probability: f64) -> Self {
        let trigger_probability = if trigger_probability.is_nan() {
            0.0
        } else {
            trigger_probability.clamp(0.0, 1.0)
        };
        Self {
            rng: StdRng::seed_from_u64(seed),
            trigger_probability,
        }
    }

    /// Derive a per-sensor source from a global seed.
    ///
    /// Each sampling task gets its own generator, so the sequence a sensor
    /// sees does not depend on how tasks interleave.
    pub fn for_sensor(seed: u64, sensor: SensorId, trigger_probability: f64) -> Self {
        let salt = (sensor as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self::new(seed ^ salt, trigger_probability)
    }
}

impl SampleSource for SimulatedSource {
    fn read(&mut self, sensor: SensorId) -> SensorReading {
        match sensor.kind() {
            SensorKind::Digital => {
                SensorReading::Digital(self.rng.gen_bool(self.trigger_probability))
            }
            SensorKind::Analog => {
                SensorReading::Analog(self.rng.gen_range(0..sensor.simulated_range()) as f64)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
