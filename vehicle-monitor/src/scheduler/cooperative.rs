/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Single-threaded cyclic executive.
//!
//! ```text
//!  ┌──────────── one step ────────────┐
//!  │ sleep(tick)                      │
//!  │ for task in priority order:      │
//!  │     if task.tick(tick_ms):       │
//!  │         run to completion        │
//!  └──────────────────────────────────┘
//! ```
//!
//! Every released task runs to completion before the next one is looked at,
//! so a unit of work that blocks (for example a producer on a full channel)
//! stalls the whole loop.  That is the inherent limit of cooperative
//! scheduling and is kept as is; the preemptive kernel exists for the case
//! where it matters.
//!
//! Tasks start `Waiting`: the first activation comes one full period after
//! the executive starts.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::clock::Clock;
use crate::task::{PeriodicTask, TaskState, TaskStats};

use super::{
    describe_task_set, record_completion, run_contained, validate_task_set, Activation,
    SchedulerError, SchedulerReport, SchedulingMode, ShutdownSignal, TaskSummary,
};

struct Slot {
    task: PeriodicTask,
    state: TaskState,
    stats: TaskStats,
}

/// Runs a fixed task set on the calling thread.
pub struct CyclicExecutive {
    slots: Vec<Slot>,
    tick: Duration,
    tick_ms: u64,
    clock: Arc<dyn Clock>,
    ticks: u64,
}

impl CyclicExecutive {
    /// Validate the task set and order it by descending priority.  Equal
    /// priorities keep their registration order.
    pub fn new(
        mut tasks: Vec<PeriodicTask>,
        tick: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SchedulerError> {
        validate_task_set(&tasks, tick)?;
        tasks.sort_by_key(|t| std::cmp::Reverse(t.priority()));

        let table: Vec<(&str, &crate::task::PeriodSpec)> =
            tasks.iter().map(|t| (t.name(), t.spec())).collect();
        describe_task_set(SchedulingMode::Cooperative, &table);

        let slots = tasks
            .into_iter()
            .map(|task| Slot {
                task,
                state: TaskState::Waiting,
                stats: TaskStats::default(),
            })
            .collect();

        Ok(Self {
            slots,
            tick,
            // whole milliseconds, checked by validate_task_set
            tick_ms: tick.as_millis() as u64,
            clock,
            ticks: 0,
        })
    }

    /// Wait one tick, then run every task whose period has elapsed.
    pub fn step(&mut self) {
        self.clock.sleep(self.tick);
        self.ticks += 1;
        let released_at = self.clock.now();

        for slot in &mut self.slots {
            if slot.state == TaskState::Terminated || !slot.task.tick(self.tick_ms) {
                continue;
            }

            slot.state = TaskState::Running;
            let started_at = self.clock.now();
            let result = run_contained(|| slot.task.run());
            record_completion(
                slot.task.name(),
                slot.task.spec(),
                &mut slot.stats,
                Activation {
                    released_at,
                    started_at,
                    finished_at: self.clock.now(),
                },
            );

            slot.state = match result {
                Ok(()) => TaskState::Waiting,
                Err(e) => {
                    error!(task = %slot.task.name(), "task failed, terminating: {e}");
                    TaskState::Terminated
                }
            };
        }
    }

    /// Run exactly `n` steps.
    pub fn run_ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Step until `shutdown` is triggered.
    pub fn run_until(&mut self, shutdown: &ShutdownSignal) {
        while !shutdown.is_triggered() {
            self.step();
        }
        debug!(ticks = self.ticks, "cyclic executive stopped");
    }

    /// Steps taken so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.slot(name).map(|s| s.state)
    }

    pub fn stats_of(&self, name: &str) -> Option<TaskStats> {
        self.slot(name).map(|s| s.stats)
    }

    /// Snapshot of every task, in execution order.
    pub fn report(&self) -> SchedulerReport {
        SchedulerReport {
            tasks: self
                .slots
                .iter()
                .map(|s| TaskSummary {
                    name: s.task.name().to_string(),
                    priority: s.task.priority(),
                    state: s.state,
                    stats: s.stats,
                })
                .collect(),
        }
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.task.name() == name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
