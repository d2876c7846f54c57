/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-priority periodic task scheduling.
//!
//! [`Scheduler`] takes a set of [`PeriodicTask`]s and drives them in one of
//! two modes:
//!
//! | Mode | Engine | Threads | Preemption points |
//! |---|---|---|---|
//! | `Cooperative` | [`CyclicExecutive`] | one | none, every activation runs to completion |
//! | `Preemptive` | [`PreemptiveKernel`] | one per task + tick thread | channel operations, [`preemption_point`] and the periodic wait |
//!
//! Both engines share the same rules:
//!
//! * Higher numeric priority wins; equal priorities go FIFO.
//! * A task's `tick()` decides when it is released (level-triggered, see
//!   [`TimerPolicy`](crate::task::TimerPolicy)).
//! * A unit of work that fails or panics is logged and the task is
//!   terminated.  There is no restart.
//! * Completion later than `deadline_ms` after release is logged and counted
//!   but not enforced.
//!
//! # Example
//! ```rust,no_run
//! use vehicle_monitor::scheduler::{Scheduler, SchedulingMode, ShutdownSignal};
//! use vehicle_monitor::task::{PeriodSpec, PeriodicTask};
//!
//! let mut scheduler = Scheduler::new(SchedulingMode::Preemptive);
//! scheduler
//!     .spawn(PeriodicTask::new("blink", PeriodSpec::implicit(100, 1), || Ok(())))
//!     .unwrap();
//! let shutdown = ShutdownSignal::new();
//! let report = scheduler.run(&shutdown).unwrap();
//! ```

pub mod cooperative;
pub mod dispatch;
pub mod error;
pub mod feasibility;
pub mod preemptive;
pub mod priority;

pub use cooperative::CyclicExecutive;
pub use error::{SchedulerError, TaskError};
pub use preemptive::{blocking_section, preemption_point, KernelHandle, PreemptiveKernel};

pub use crate::task::{BlockReason, TaskState};

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::hyperperiod::MajorFrame;
use crate::task::{PeriodSpec, PeriodicTask, TaskStats};

use feasibility::overload;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Scheduler tick granularity: 1 ms.
pub const DEFAULT_TICK: Duration = Duration::from_millis(1);

// ── Mode ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    /// Single-threaded cyclic executive.
    Cooperative,
    /// One thread per task, fixed-priority dispatch.
    #[default]
    Preemptive,
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingMode::Cooperative => f.write_str("cooperative"),
            SchedulingMode::Preemptive => f.write_str("preemptive"),
        }
    }
}

// ── ShutdownSignal ────────────────────────────────────────────────────────────

/// One-shot stop request shared between the run loop and whoever ends it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiter.  Idempotent.
    pub fn trigger(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until [`trigger`](Self::trigger) is called.
    pub fn wait(&self) {
        let (flag, cvar) = &*self.inner;
        let mut triggered = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*triggered {
            triggered = cvar.wait(triggered).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`.  Returns `true` if triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (triggered, _) = cvar
            .wait_timeout_while(guard, timeout, |t| !*t)
            .unwrap_or_else(PoisonError::into_inner);
        *triggered
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Final (or live) view of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub name: String,
    pub priority: i32,
    pub state: TaskState,
    pub stats: TaskStats,
}

/// Per-task outcome of a scheduler run, in scheduling order.
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    pub tasks: Vec<TaskSummary>,
}

impl SchedulerReport {
    pub fn get(&self, name: &str) -> Option<&TaskSummary> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Emit one `info!` line per task.
    pub fn log(&self) {
        for t in &self.tasks {
            info!(
                task        = %t.name,
                priority    = t.priority,
                state       = %t.state,
                activations = t.stats.activations,
                deadline_misses    = t.stats.deadline_misses,
                collapsed_releases = t.stats.collapsed_releases,
                preemptions        = t.stats.preemptions,
                max_execution_us   = t.stats.max_execution_us,
                "task summary"
            );
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Mode-independent front end.  Collects tasks, then hands them to the
/// engine selected by [`SchedulingMode`].
pub struct Scheduler {
    mode: SchedulingMode,
    tick: Duration,
    clock: Arc<dyn Clock>,
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    pub fn new(mode: SchedulingMode) -> Self {
        Self {
            mode,
            tick: DEFAULT_TICK,
            clock: Arc::new(MonotonicClock::new()),
            tasks: Vec::new(),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn mode(&self) -> SchedulingMode {
        self.mode
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Register a task.  Its timing contract and name are checked now so a
    /// bad task never reaches the engine.
    pub fn spawn(&mut self, task: PeriodicTask) -> Result<(), SchedulerError> {
        task.spec().validate(task.name())?;
        if self.tasks.iter().any(|t| t.name() == task.name()) {
            return Err(SchedulerError::DuplicateTask {
                task: task.name().to_string(),
            });
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Run until `shutdown` is triggered, then return the per-task report.
    ///
    /// Blocks the calling thread.
    pub fn run(self, shutdown: &ShutdownSignal) -> Result<SchedulerReport, SchedulerError> {
        match self.mode {
            SchedulingMode::Cooperative => {
                let mut exec = CyclicExecutive::new(self.tasks, self.tick, self.clock)?;
                exec.run_until(shutdown);
                Ok(exec.report())
            }
            SchedulingMode::Preemptive => {
                let handle = PreemptiveKernel::new(self.tasks, self.tick, self.clock)?.start()?;
                shutdown.wait();
                Ok(handle.shutdown())
            }
        }
    }
}

// ── Shared engine helpers ─────────────────────────────────────────────────────

/// Preconditions common to both engines.
pub(crate) fn validate_task_set(
    tasks: &[PeriodicTask],
    tick: Duration,
) -> Result<(), SchedulerError> {
    if tasks.is_empty() {
        return Err(SchedulerError::NoTasks);
    }
    // timers advance in whole milliseconds
    if tick < Duration::from_millis(1) || tick.subsec_nanos() % 1_000_000 != 0 {
        return Err(SchedulerError::InvalidTick);
    }
    let mut seen = HashSet::new();
    for task in tasks {
        task.spec().validate(task.name())?;
        if !seen.insert(task.name()) {
            return Err(SchedulerError::DuplicateTask {
                task: task.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Log the task table, the major frame and the feasibility verdict.
pub(crate) fn describe_task_set(mode: SchedulingMode, tasks: &[(&str, &PeriodSpec)]) {
    info!(mode = %mode, task_count = tasks.len(), "=== scheduler starting ===");
    for (name, spec) in tasks {
        info!(
            task        = %name,
            priority    = spec.priority,
            period_ms   = spec.period_ms,
            deadline_ms = spec.deadline_ms,
            "  task registered"
        );
    }

    let periods: Vec<u64> = tasks.iter().map(|(_, s)| s.period_ms).collect();
    match MajorFrame::from_periods(&periods) {
        Ok(frame) => info!(
            major_frame_ms = frame.major_ms,
            minor_frame_ms = frame.minor_ms,
            unique_periods = ?frame.unique_periods,
            "task set frame"
        ),
        Err(e) => warn!("cannot compute major frame: {e}"),
    }

    let specs: Vec<&PeriodSpec> = tasks.iter().map(|(_, s)| *s).collect();
    if let Some(o) = overload(&specs) {
        warn!(
            utilization = o.utilization,
            bound       = o.bound,
            task_count  = o.tasks,
            "task set may not be schedulable (utilization exceeds the fixed-priority bound)"
        );
    }
}

/// Run a unit of work, turning a panic into [`TaskError::Panicked`].
pub(crate) fn run_contained<F>(work: F) -> Result<(), TaskError>
where
    F: FnOnce() -> Result<(), TaskError>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Instants of one activation on the scheduler clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Activation {
    pub released_at: Duration,
    pub started_at: Duration,
    pub finished_at: Duration,
}

/// Count one activation, log its execution time and check its response
/// time against the deadline.
pub(crate) fn record_completion(
    name: &str,
    spec: &PeriodSpec,
    stats: &mut TaskStats,
    activation: Activation,
) {
    stats.activations += 1;

    let execution = activation.finished_at.saturating_sub(activation.started_at);
    let execution_us = execution.as_micros() as u64;
    stats.max_execution_us = stats.max_execution_us.max(execution_us);
    debug!(task = %name, execution_us, "activation complete");

    let response = activation.finished_at.saturating_sub(activation.released_at);
    if response > Duration::from_millis(spec.deadline_ms) {
        stats.deadline_misses += 1;
        warn!(
            task        = %name,
            response_us = response.as_micros() as u64,
            deadline_ms = spec.deadline_ms,
            misses      = stats.deadline_misses,
            "deadline miss"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
