/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! System configuration loading.
//!
//! Every field is optional; anything missing falls back to the default
//! vehicle workload.  The expected YAML structure is:
//! ```yaml
//! mode: preemptive            # or cooperative
//! tick_ms: 1
//! timer_policy: reset_to_zero # or subtract_period
//! seed: 42
//! trigger_probability: 0.05
//! window_capacity: 200
//! channels:
//!   aggregate_capacity: 10
//!   event_capacity: 32
//!   send_timeout_ms: 50       # absent = wait indefinitely
//! sensors:                    # absent or {} = all seven sensors
//!   injection: { period_ms: 15 }
//!   speed:     { period_ms: 100, deadline_ms: 80, priority: 5, wcet_us: 200 }
//! reporter:
//!   period_ms: 1000
//!   aggregate_wait: poll      # poll | block | timeout
//!   aggregate_timeout_ms: 100
//! ```

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::channel::SendPolicy;
use crate::scheduler::priority::{deadline_monotonic, LOWEST_PRIORITY};
use crate::scheduler::{SchedulingMode, DEFAULT_TICK};
use crate::sensor::SensorId;
use crate::task::{PeriodSpec, TimerPolicy};

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_WINDOW_CAPACITY: NonZeroUsize = capacity(200);
pub const DEFAULT_AGGREGATE_CAPACITY: NonZeroUsize = capacity(10);
pub const DEFAULT_EVENT_CAPACITY: NonZeroUsize = capacity(32);
pub const DEFAULT_REPORTER_PERIOD_MS: u64 = 1_000;
pub const DEFAULT_AGGREGATE_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_TRIGGER_PROBABILITY: f64 = 0.05;
pub const DEFAULT_SEED: u64 = 42;

const fn capacity(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("capacity must be non-zero"),
    }
}

/// Sampling period of each sensor in the default workload.
pub fn default_period_ms(sensor: SensorId) -> u64 {
    match sensor {
        SensorId::Injection => 15,
        SensorId::Temperature => 20,
        SensorId::Abs | SensorId::Airbag => 100,
        SensorId::Seatbelt => 1_000,
        SensorId::Speed | SensorId::Consumption => 100,
    }
}

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
struct SystemConfigFile {
    mode: Option<SchedulingMode>,
    tick_ms: Option<u64>,
    timer_policy: Option<TimerPolicy>,
    seed: Option<u64>,
    trigger_probability: Option<f64>,
    window_capacity: Option<usize>,
    #[serde(default)]
    channels: ChannelsEntry,
    #[serde(default)]
    sensors: BTreeMap<SensorId, TimingEntry>,
    #[serde(default)]
    reporter: ReporterEntry,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelsEntry {
    aggregate_capacity: Option<usize>,
    event_capacity: Option<usize>,
    send_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TimingEntry {
    period_ms: Option<u64>,
    deadline_ms: Option<u64>,
    priority: Option<i32>,
    wcet_us: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReporterEntry {
    #[serde(flatten)]
    timing: TimingEntry,
    #[serde(default)]
    aggregate_wait: AggregateWaitEntry,
    aggregate_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AggregateWaitEntry {
    #[default]
    Poll,
    Block,
    Timeout,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Timing of one task as configured.  `priority: None` means "derive it
/// from the deadline".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTiming {
    pub period_ms: u64,
    pub deadline_ms: u64,
    pub priority: Option<i32>,
    pub wcet_us: u64,
}

impl TaskTiming {
    /// Implicit deadline, derived priority, unknown WCET.
    pub fn periodic(period_ms: u64) -> Self {
        Self {
            period_ms,
            deadline_ms: period_ms,
            priority: None,
            wcet_us: 0,
        }
    }

    fn from_entry(entry: TimingEntry, default_period_ms: u64) -> Self {
        let period_ms = entry.period_ms.unwrap_or(default_period_ms);
        Self {
            period_ms,
            deadline_ms: entry.deadline_ms.unwrap_or(period_ms),
            priority: entry.priority,
            wcet_us: entry.wcet_us.unwrap_or(0),
        }
    }
}

/// How the reporter collects aggregates each period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateWait {
    /// Take whatever is queued and move on.
    #[default]
    Poll,
    /// Wait indefinitely for at least one aggregate.
    Block,
    /// Wait up to the given time for at least one aggregate.
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub sensor: SensorId,
    pub timing: TaskTiming,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReporterConfig {
    pub timing: TaskTiming,
    pub aggregate_wait: AggregateWait,
}

/// Fully resolved configuration of the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub mode: SchedulingMode,
    pub tick: Duration,
    pub timer_policy: TimerPolicy,
    pub seed: u64,
    pub trigger_probability: f64,
    pub window_capacity: NonZeroUsize,
    pub aggregate_capacity: NonZeroUsize,
    pub event_capacity: NonZeroUsize,
    pub send_policy: SendPolicy,
    /// Enabled sensors, in registration order.
    pub sensors: Vec<SensorConfig>,
    pub reporter: ReporterConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            mode: SchedulingMode::default(),
            tick: DEFAULT_TICK,
            timer_policy: TimerPolicy::default(),
            seed: DEFAULT_SEED,
            trigger_probability: DEFAULT_TRIGGER_PROBABILITY,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            aggregate_capacity: DEFAULT_AGGREGATE_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            send_policy: SendPolicy::default(),
            sensors: default_sensors(),
            reporter: ReporterConfig {
                timing: TaskTiming::periodic(DEFAULT_REPORTER_PERIOD_MS),
                aggregate_wait: AggregateWait::default(),
            },
        }
    }
}

impl SystemConfig {
    /// Parse `path` and resolve it against the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or a value is out of range (zero capacity, zero period,
    /// deadline beyond period).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading system configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse a YAML document.  An empty document yields the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: SystemConfigFile = if content.trim().is_empty() {
            SystemConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };
        let cfg = Self::resolve(file)?;

        debug!(
            mode     = %cfg.mode,
            sensors  = cfg.sensors.len(),
            seed     = cfg.seed,
            "configuration resolved"
        );
        Ok(cfg)
    }

    fn resolve(file: SystemConfigFile) -> Result<Self> {
        let tick_ms = file.tick_ms.unwrap_or(DEFAULT_TICK.as_millis() as u64);
        if tick_ms == 0 {
            bail!("tick_ms must be at least 1");
        }

        let trigger_probability = file
            .trigger_probability
            .unwrap_or(DEFAULT_TRIGGER_PROBABILITY);
        if !(0.0..=1.0).contains(&trigger_probability) {
            bail!("trigger_probability {trigger_probability} is outside [0, 1]");
        }

        let sensors: Vec<SensorConfig> = if file.sensors.is_empty() {
            default_sensors()
        } else {
            file.sensors
                .into_iter()
                .map(|(sensor, entry)| SensorConfig {
                    sensor,
                    timing: TaskTiming::from_entry(entry, default_period_ms(sensor)),
                })
                .collect()
        };

        let aggregate_wait = match file.reporter.aggregate_wait {
            AggregateWaitEntry::Poll => AggregateWait::Poll,
            AggregateWaitEntry::Block => AggregateWait::Block,
            AggregateWaitEntry::Timeout => AggregateWait::Timeout(Duration::from_millis(
                file.reporter
                    .aggregate_timeout_ms
                    .unwrap_or(DEFAULT_AGGREGATE_TIMEOUT_MS),
            )),
        };

        let send_policy = match file.channels.send_timeout_ms {
            Some(ms) => SendPolicy::Timeout(Duration::from_millis(ms)),
            None => SendPolicy::Block,
        };

        let cfg = Self {
            mode: file.mode.unwrap_or_default(),
            tick: Duration::from_millis(tick_ms),
            timer_policy: file.timer_policy.unwrap_or_default(),
            seed: file.seed.unwrap_or(DEFAULT_SEED),
            trigger_probability,
            window_capacity: non_zero(
                "window_capacity",
                file.window_capacity.unwrap_or(DEFAULT_WINDOW_CAPACITY.get()),
            )?,
            aggregate_capacity: non_zero(
                "channels.aggregate_capacity",
                file.channels
                    .aggregate_capacity
                    .unwrap_or(DEFAULT_AGGREGATE_CAPACITY.get()),
            )?,
            event_capacity: non_zero(
                "channels.event_capacity",
                file.channels.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY.get()),
            )?,
            send_policy,
            sensors,
            reporter: ReporterConfig {
                timing: TaskTiming::from_entry(file.reporter.timing, DEFAULT_REPORTER_PERIOD_MS),
                aggregate_wait,
            },
        };

        let (sensor_specs, reporter_spec) = cfg.task_specs();
        for (sensor, spec) in &sensor_specs {
            spec.validate(sensor.name())?;
        }
        reporter_spec.validate("reporter")?;

        Ok(cfg)
    }

    /// Resolve every task's [`PeriodSpec`].
    ///
    /// Priorities are assigned deadline-monotonically across the sensors and
    /// the reporter together; an explicit `priority` overrides the derived
    /// value for that task only.
    pub fn task_specs(&self) -> (Vec<(SensorId, PeriodSpec)>, PeriodSpec) {
        let mut deadlines: Vec<u64> = self
            .sensors
            .iter()
            .map(|s| s.timing.deadline_ms)
            .collect();
        deadlines.push(self.reporter.timing.deadline_ms);
        let derived = deadline_monotonic(&deadlines);

        let to_spec = |timing: &TaskTiming, derived: i32| {
            PeriodSpec::new(
                timing.period_ms,
                timing.deadline_ms,
                timing.priority.unwrap_or(derived),
            )
            .with_wcet_us(timing.wcet_us)
        };

        let sensors = self
            .sensors
            .iter()
            .zip(&derived)
            .map(|(s, &p)| (s.sensor, to_spec(&s.timing, p)))
            .collect();
        let reporter_derived = derived.last().copied().unwrap_or(LOWEST_PRIORITY);
        let reporter = to_spec(&self.reporter.timing, reporter_derived);
        (sensors, reporter)
    }
}

fn default_sensors() -> Vec<SensorConfig> {
    SensorId::ALL
        .iter()
        .map(|&sensor| SensorConfig {
            sensor,
            timing: TaskTiming::periodic(default_period_ms(sensor)),
        })
        .collect()
}

fn non_zero(field: &str, value: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(value).with_context(|| format!("{field} must be greater than zero"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn defaults_describe_the_vehicle_workload() {
        let cfg = SystemConfig::default();
        assert_eq!(cfg.mode, SchedulingMode::Preemptive);
        assert_eq!(cfg.tick, Duration::from_millis(1));
        assert_eq!(cfg.timer_policy, TimerPolicy::ResetToZero);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.window_capacity.get(), 200);
        assert_eq!(cfg.aggregate_capacity.get(), 10);
        assert_eq!(cfg.event_capacity.get(), 32);
        assert_eq!(cfg.send_policy, SendPolicy::Block);
        assert_eq!(cfg.reporter.aggregate_wait, AggregateWait::Poll);
        assert_eq!(cfg.reporter.timing.period_ms, 1_000);

        let sensors: Vec<SensorId> = cfg.sensors.iter().map(|s| s.sensor).collect();
        assert_eq!(sensors, SensorId::ALL.to_vec());
    }

    #[test]
    fn default_priorities_are_deadline_monotonic() {
        let (sensors, reporter) = SystemConfig::default().task_specs();
        let prio = |id: SensorId| sensors.iter().find(|(s, _)| *s == id).unwrap().1.priority;

        assert_eq!(prio(SensorId::Injection), 4);
        assert_eq!(prio(SensorId::Temperature), 3);
        assert_eq!(prio(SensorId::Abs), 2);
        assert_eq!(prio(SensorId::Speed), 2);
        assert_eq!(prio(SensorId::Seatbelt), 1);
        assert_eq!(reporter.priority, 1);
    }

    #[test]
    fn empty_document_is_the_default() {
        assert_eq!(SystemConfig::from_yaml_str("").unwrap(), SystemConfig::default());
        assert_eq!(
            SystemConfig::from_yaml_str("sensors: {}\n").unwrap(),
            SystemConfig::default()
        );
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
mode: cooperative
tick_ms: 2
timer_policy: subtract_period
seed: 7
trigger_probability: 0.5
window_capacity: 50
channels:
  aggregate_capacity: 4
  event_capacity: 8
  send_timeout_ms: 25
sensors:
  abs: { period_ms: 50 }
  speed: { period_ms: 100, deadline_ms: 80, priority: 9, wcet_us: 200 }
reporter:
  period_ms: 500
  aggregate_wait: timeout
  aggregate_timeout_ms: 40
"#;
        let f = yaml_tempfile(yaml);
        let cfg = SystemConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.mode, SchedulingMode::Cooperative);
        assert_eq!(cfg.tick, Duration::from_millis(2));
        assert_eq!(cfg.timer_policy, TimerPolicy::SubtractPeriod);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.window_capacity.get(), 50);
        assert_eq!(cfg.aggregate_capacity.get(), 4);
        assert_eq!(cfg.event_capacity.get(), 8);
        assert_eq!(cfg.send_policy, SendPolicy::Timeout(Duration::from_millis(25)));
        assert_eq!(
            cfg.reporter.aggregate_wait,
            AggregateWait::Timeout(Duration::from_millis(40))
        );

        assert_eq!(cfg.sensors.len(), 2);
        assert_eq!(cfg.sensors[0].sensor, SensorId::Abs);
        assert_eq!(cfg.sensors[0].timing, TaskTiming::periodic(50));
        let speed = cfg.sensors[1].timing;
        assert_eq!(speed.deadline_ms, 80);
        assert_eq!(speed.priority, Some(9));
        assert_eq!(speed.wcet_us, 200);
    }

    #[test]
    fn shipped_vehicle_yaml_is_the_default_workload() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("vehicle.yaml");
        let cfg = SystemConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg, SystemConfig::default());
    }

    #[test]
    fn explicit_priority_overrides_only_that_task() {
        let yaml = r#"
sensors:
  injection: {}
  seatbelt: { priority: 10 }
"#;
        let cfg = SystemConfig::from_yaml_str(yaml).unwrap();
        let (sensors, reporter) = cfg.task_specs();
        assert_eq!(sensors[0], (SensorId::Injection, PeriodSpec::implicit(15, 2)));
        assert_eq!(sensors[1].1.priority, 10);
        assert_eq!(reporter.priority, 1);
    }

    #[test]
    fn missing_file_returns_error() {
        let result = SystemConfig::load_from_file(Path::new("/nonexistent/path/vehicle.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(SystemConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn unknown_sensor_is_rejected() {
        let err = SystemConfig::from_yaml_str("sensors:\n  radar: {}\n").unwrap_err();
        assert!(format!("{err:#}").contains("radar"), "{err:#}");
    }

    // ── validation ────────────────────────────────────────────────────────────

    #[test]
    fn zero_capacity_is_rejected() {
        let err = SystemConfig::from_yaml_str("channels:\n  aggregate_capacity: 0\n").unwrap_err();
        assert!(err.to_string().contains("aggregate_capacity"), "{err:#}");
        assert!(SystemConfig::from_yaml_str("window_capacity: 0\n").is_err());
    }

    #[test]
    fn deadline_beyond_period_is_rejected() {
        let yaml = "sensors:\n  abs: { period_ms: 100, deadline_ms: 150 }\n";
        let err = SystemConfig::from_yaml_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("deadline 150ms"), "{err:#}");
    }

    #[test]
    fn zero_period_and_zero_tick_are_rejected() {
        assert!(SystemConfig::from_yaml_str("sensors:\n  abs: { period_ms: 0 }\n").is_err());
        assert!(SystemConfig::from_yaml_str("reporter:\n  period_ms: 0\n").is_err());
        assert!(SystemConfig::from_yaml_str("tick_ms: 0\n").is_err());
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        assert!(SystemConfig::from_yaml_str("trigger_probability: 1.5\n").is_err());
    }
}
