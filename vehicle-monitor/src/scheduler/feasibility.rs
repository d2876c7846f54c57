/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Start-up utilisation check.
//!
//! Tasks that declare a `wcet_us` contribute `wcet / period`; the sum is
//! compared with the fixed-priority bound `n(2^(1/n) - 1)` for the `n`
//! declaring tasks.  Going over the bound only produces a warning, the
//! vehicle workload still runs.

use crate::task::PeriodSpec;

/// Utilisation of the declaring tasks when it exceeds the bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overload {
    pub utilization: f64,
    pub bound: f64,
    /// Tasks that declared a WCET.
    pub tasks: usize,
}

/// Fixed-priority utilisation bound for `n` tasks; `0.0` for none.
pub fn utilization_bound(n: usize) -> f64 {
    match n {
        0 => 0.0,
        n => {
            let n = n as f64;
            n * (2.0_f64.powf(n.recip()) - 1.0)
        }
    }
}

/// `Some` when the tasks with a known WCET load the CPU past the bound.
pub fn overload(specs: &[&PeriodSpec]) -> Option<Overload> {
    let (tasks, utilization) = specs
        .iter()
        .filter(|s| s.wcet_us > 0)
        .fold((0, 0.0), |(n, u), s| (n + 1, u + s.utilization()));

    let bound = utilization_bound(tasks);
    (tasks > 0 && utilization > bound).then_some(Overload {
        utilization,
        bound,
        tasks,
    })
}
