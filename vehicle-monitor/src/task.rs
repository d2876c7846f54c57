/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic task data structures.
//!
//! ```text
//!               ┌────────────── PeriodicTask ──────────────┐
//! config ──►    │ name · PeriodSpec · PeriodicTimer · work │  ──► Scheduler
//!               └──────────────────────────────────────────┘
//! ```
//!
//! # Ownership model
//! A `PeriodicTask` is **moved** into a scheduler.  The cyclic executive keeps
//! it whole; the preemptive kernel splits it with [`PeriodicTask::into_parts`]:
//! the timer stays in the kernel's task table (driven by the tick thread), the
//! unit of work moves onto the task's own thread.

use std::fmt;

use serde::Deserialize;

use crate::scheduler::{SchedulerError, TaskError};

// ── Timer policy ──────────────────────────────────────────────────────────────

/// What happens to the accumulated time when a period fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPolicy {
    /// Accumulator goes back to zero.  Any overshoot past the period is
    /// discarded, so activations drift late over time.  This is the
    /// behaviour of a plain tick counter and the default.
    #[default]
    ResetToZero,

    /// Accumulator is reduced by one period, keeping the overshoot.  Drift
    /// free; a backlog of `k` periods fires on `k` consecutive checks.
    SubtractPeriod,
}

// ── PeriodSpec ────────────────────────────────────────────────────────────────

/// Timing contract of a periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSpec {
    /// Nominal re-execution interval in ms.
    pub period_ms: u64,

    /// Latest acceptable completion, relative to release, in ms.
    /// Must not exceed `period_ms`.
    pub deadline_ms: u64,

    /// Higher number = more urgent.
    pub priority: i32,

    /// Worst-case execution time in µs.  `0` means unknown; such tasks are
    /// left out of the feasibility analysis.
    pub wcet_us: u64,
}

impl PeriodSpec {
    pub fn new(period_ms: u64, deadline_ms: u64, priority: i32) -> Self {
        Self {
            period_ms,
            deadline_ms,
            priority,
            wcet_us: 0,
        }
    }

    /// Implicit-deadline task: deadline equals period.
    pub fn implicit(period_ms: u64, priority: i32) -> Self {
        Self::new(period_ms, period_ms, priority)
    }

    pub fn with_wcet_us(mut self, wcet_us: u64) -> Self {
        self.wcet_us = wcet_us;
        self
    }

    /// Check the invariants `period > 0`, `deadline > 0` and
    /// `deadline ≤ period`.
    pub fn validate(&self, task: &str) -> Result<(), SchedulerError> {
        if self.period_ms == 0 {
            return Err(SchedulerError::ZeroPeriod {
                task: task.to_string(),
            });
        }
        if self.deadline_ms == 0 || self.deadline_ms > self.period_ms {
            return Err(SchedulerError::InvalidDeadline {
                task: task.to_string(),
                deadline_ms: self.deadline_ms,
                period_ms: self.period_ms,
            });
        }
        Ok(())
    }

    /// CPU utilisation fraction `wcet / period`.
    ///
    /// Returns `0.0` when either value is zero.
    pub fn utilization(&self) -> f64 {
        if self.period_ms == 0 {
            0.0
        } else {
            self.wcet_us as f64 / (self.period_ms as f64 * 1_000.0)
        }
    }
}

// ── PeriodicTimer ─────────────────────────────────────────────────────────────

/// Level-triggered period accumulator.
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    period_ms: u64,
    accumulated_ms: u64,
    policy: TimerPolicy,
}

impl PeriodicTimer {
    pub fn new(period_ms: u64, policy: TimerPolicy) -> Self {
        Self {
            period_ms,
            accumulated_ms: 0,
            policy,
        }
    }

    /// Add `elapsed_ms` and report whether the period has elapsed.
    ///
    /// Fires at most once per call, however many periods are covered by the
    /// accumulated time.
    pub fn tick(&mut self, elapsed_ms: u64) -> bool {
        self.accumulated_ms = self.accumulated_ms.saturating_add(elapsed_ms);
        if self.accumulated_ms < self.period_ms {
            return false;
        }
        match self.policy {
            TimerPolicy::ResetToZero => self.accumulated_ms = 0,
            TimerPolicy::SubtractPeriod => self.accumulated_ms -= self.period_ms,
        }
        true
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn policy(&self) -> TimerPolicy {
        self.policy
    }
}

// ── Task state ────────────────────────────────────────────────────────────────

/// What a blocked task is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Producer waiting for queue space.
    ChannelFull,
    /// Consumer waiting for a message.
    ChannelEmpty,
    /// A sample source that has to wait for hardware.  The simulated source
    /// never does.
    SensorUnavailable,
}

/// Scheduler-visible lifecycle of a task.
///
/// Only the scheduler moves a task between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Released and queued for the CPU.
    Ready,
    /// Executing its unit of work.
    Running,
    /// Done for this period; waiting for the next release.
    Waiting,
    /// Suspended inside a blocking operation.
    Blocked(BlockReason),
    /// Failed or shut down.  Never runs again.
    Terminated,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Ready => f.write_str("ready"),
            TaskState::Running => f.write_str("running"),
            TaskState::Waiting => f.write_str("waiting"),
            TaskState::Blocked(BlockReason::ChannelFull) => f.write_str("blocked(channel full)"),
            TaskState::Blocked(BlockReason::ChannelEmpty) => f.write_str("blocked(channel empty)"),
            TaskState::Blocked(BlockReason::SensorUnavailable) => {
                f.write_str("blocked(sensor unavailable)")
            }
            TaskState::Terminated => f.write_str("terminated"),
        }
    }
}

/// Per-task counters collected by both schedulers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Times the unit of work ran.
    pub activations: u64,
    /// Activations that completed later than `deadline_ms` after release.
    pub deadline_misses: u64,
    /// Releases that arrived while the previous one was still pending and
    /// were folded into it.
    pub collapsed_releases: u64,
    /// Times the task lost the CPU to a higher-priority task mid-activation.
    pub preemptions: u64,
    /// Longest activation seen, from start of work to completion, in µs.
    pub max_execution_us: u64,
}

// ── PeriodicTask ──────────────────────────────────────────────────────────────

/// Boxed unit of work.  Returning `Err` terminates the task.
pub type Work = Box<dyn FnMut() -> Result<(), TaskError> + Send>;

/// A unit of work bound to a [`PeriodSpec`].
pub struct PeriodicTask {
    name: String,
    spec: PeriodSpec,
    timer: PeriodicTimer,
    work: Work,
}

impl PeriodicTask {
    pub fn new<F>(name: impl Into<String>, spec: PeriodSpec, work: F) -> Self
    where
        F: FnMut() -> Result<(), TaskError> + Send + 'static,
    {
        Self {
            name: name.into(),
            timer: PeriodicTimer::new(spec.period_ms, TimerPolicy::default()),
            spec,
            work: Box::new(work),
        }
    }

    /// Replace the timer policy.  Resets the accumulator.
    pub fn with_timer_policy(mut self, policy: TimerPolicy) -> Self {
        self.timer = PeriodicTimer::new(self.spec.period_ms, policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &PeriodSpec {
        &self.spec
    }

    pub fn priority(&self) -> i32 {
        self.spec.priority
    }

    /// Advance the task's timer.  See [`PeriodicTimer::tick`].
    pub fn tick(&mut self, elapsed_ms: u64) -> bool {
        self.timer.tick(elapsed_ms)
    }

    /// Execute the unit of work once.
    pub fn run(&mut self) -> Result<(), TaskError> {
        (self.work)()
    }

    /// Split into the kernel-side header and timer and the thread-side work.
    pub(crate) fn into_parts(self) -> (String, PeriodSpec, PeriodicTimer, Work) {
        (self.name, self.spec, self.timer, self.work)
    }
}

impl fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── PeriodSpec ────────────────────────────────────────────────────────────

    #[test]
    fn implicit_deadline_equals_period() {
        let spec = PeriodSpec::implicit(100, 2);
        assert_eq!(spec.deadline_ms, 100);
        assert!(spec.validate("abs").is_ok());
    }

    #[test]
    fn deadline_longer_than_period_is_rejected() {
        let err = PeriodSpec::new(10, 20, 1).validate("t").unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidDeadline {
                deadline_ms: 20,
                period_ms: 10,
                ..
            }
        ));
    }

    #[test]
    fn zero_period_and_zero_deadline_are_rejected() {
        assert!(matches!(
            PeriodSpec::new(0, 0, 1).validate("t"),
            Err(SchedulerError::ZeroPeriod { .. })
        ));
        assert!(matches!(
            PeriodSpec::new(10, 0, 1).validate("t"),
            Err(SchedulerError::InvalidDeadline { .. })
        ));
    }

    #[test]
    fn utilization_uses_wcet_over_period() {
        let spec = PeriodSpec::implicit(10, 1).with_wcet_us(2_500);
        assert!((spec.utilization() - 0.25).abs() < 1e-12);
        assert_eq!(PeriodSpec::implicit(10, 1).utilization(), 0.0);
    }

    // ── PeriodicTimer ─────────────────────────────────────────────────────────

    #[test]
    fn increments_summing_to_period_fire_once_and_reset() {
        let mut timer = PeriodicTimer::new(20, TimerPolicy::ResetToZero);
        assert!(!timer.tick(5));
        assert!(!timer.tick(5));
        assert!(!timer.tick(9));
        assert!(timer.tick(1));
        assert_eq!(timer.accumulated_ms(), 0);
    }

    #[test]
    fn reset_to_zero_discards_overshoot() {
        let mut timer = PeriodicTimer::new(10, TimerPolicy::ResetToZero);
        assert!(timer.tick(13));
        assert_eq!(timer.accumulated_ms(), 0, "reset to zero, not to the remainder");
    }

    #[test]
    fn two_missed_periods_collapse_into_one_firing() {
        let mut timer = PeriodicTimer::new(10, TimerPolicy::ResetToZero);
        assert!(timer.tick(20));
        assert!(!timer.tick(0), "the second period is not reported");
    }

    #[test]
    fn subtract_period_keeps_the_backlog() {
        let mut timer = PeriodicTimer::new(10, TimerPolicy::SubtractPeriod);
        assert!(timer.tick(23));
        assert_eq!(timer.accumulated_ms(), 13);
        assert!(timer.tick(0));
        assert_eq!(timer.accumulated_ms(), 3);
        assert!(!timer.tick(0));
    }

    #[test]
    fn subtract_period_does_not_drift() {
        // 1 ms ticks against a 3 ms period with an occasional 2 ms jitter tick:
        // every 3 ms of input must yield exactly one firing.
        let mut timer = PeriodicTimer::new(3, TimerPolicy::SubtractPeriod);
        let increments = [1, 2, 1, 1, 1, 2, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 1, 1];
        let total: u64 = increments.iter().sum();
        let fired = increments.iter().filter(|&&i| timer.tick(i)).count() as u64;
        assert_eq!(fired, total / 3);
    }

    // ── PeriodicTask ──────────────────────────────────────────────────────────

    #[test]
    fn task_runs_its_work_and_reports_errors() {
        let mut calls = 0;
        let mut task = PeriodicTask::new("t", PeriodSpec::implicit(1, 1), move || {
            calls += 1;
            if calls > 1 {
                Err(TaskError::Failed("second call".into()))
            } else {
                Ok(())
            }
        });
        assert!(task.run().is_ok());
        assert!(task.run().is_err());
    }

    #[test]
    fn with_timer_policy_replaces_the_policy() {
        let task = PeriodicTask::new("t", PeriodSpec::implicit(5, 1), || Ok(()))
            .with_timer_policy(TimerPolicy::SubtractPeriod);
        let (name, spec, timer, _work) = task.into_parts();
        assert_eq!(name, "t");
        assert_eq!(spec.period_ms, 5);
        assert_eq!(timer.policy(), TimerPolicy::SubtractPeriod);
    }

    #[test]
    fn task_state_display_names() {
        assert_eq!(TaskState::Waiting.to_string(), "waiting");
        assert_eq!(
            TaskState::Blocked(BlockReason::ChannelFull).to_string(),
            "blocked(channel full)"
        );
    }
}
