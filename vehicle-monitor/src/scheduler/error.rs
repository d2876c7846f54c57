/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the schedulers.
//!
//! Two error enums model the two failure layers:
//!
//! * [`SchedulerError`]: the task set was rejected before anything ran, or
//!   the kernel could not start a thread.
//! * [`TaskError`]: one activation of one task failed.  The scheduler logs
//!   it and terminates that task; the rest of the system keeps running.
//!
//! **Do not** replace these with `anyhow::Error` in library paths; the
//! structured variants are matched on by callers and tests.

use thiserror::Error;

// ── Task-level failures ───────────────────────────────────────────────────────

/// Failure of a single unit of work.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The peer of a channel the task depends on has gone away.
    #[error("channel '{channel}' disconnected")]
    ChannelClosed { channel: &'static str },

    /// The unit of work panicked.  The panic is contained to the task.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// Any other failure reported by the work itself.
    #[error("{0}")]
    Failed(String),
}

// ── Top-level scheduler errors ────────────────────────────────────────────────

/// Reasons a task set cannot be scheduled.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `run()` was called without any task.
    #[error("no tasks provided, task list is empty")]
    NoTasks,

    /// Two tasks share a name.  Names key the report and the logs.
    #[error("duplicate task name '{task}'")]
    DuplicateTask { task: String },

    #[error("task '{task}' has a zero period")]
    ZeroPeriod { task: String },

    /// Deadline is zero or longer than the period.
    #[error("task '{task}' deadline {deadline_ms}ms is outside (0, period {period_ms}ms]")]
    InvalidDeadline {
        task: String,
        deadline_ms: u64,
        period_ms: u64,
    },

    /// The scheduler tick must be a whole, non-zero number of milliseconds.
    #[error("scheduler tick must be a whole number of milliseconds, at least 1ms")]
    InvalidTick,

    /// The OS refused to start a task thread.
    #[error("failed to spawn thread for task '{task}'")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },
}
