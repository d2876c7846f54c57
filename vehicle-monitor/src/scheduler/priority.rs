/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deadline-monotonic priority assignment.
//!
//! Shorter deadline ⇒ higher numeric priority.  Tasks with equal deadlines
//! share a priority (the schedulers then break ties FIFO).  The loosest
//! deadline in the set gets [`LOWEST_PRIORITY`].

/// Priority given to the task(s) with the longest deadline.
pub const LOWEST_PRIORITY: i32 = 1;

/// Map each deadline in `deadlines_ms` to its priority, preserving order.
///
/// ```rust
/// use vehicle_monitor::scheduler::priority::deadline_monotonic;
///
/// // injection, temperature, abs, reporter
/// let prios = deadline_monotonic(&[15, 20, 100, 1_000]);
/// assert_eq!(prios, vec![4, 3, 2, 1]);
/// ```
pub fn deadline_monotonic(deadlines_ms: &[u64]) -> Vec<i32> {
    // Distinct deadlines, loosest first → rank 0 is the lowest priority
    let mut distinct: Vec<u64> = deadlines_ms.to_vec();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();

    deadlines_ms
        .iter()
        .map(|d| {
            // binary_search_by on a descending slice: compare reversed
            let rank = distinct
                .binary_search_by(|probe| d.cmp(probe))
                .unwrap_or_default();
            LOWEST_PRIORITY + rank as i32
        })
        .collect()
}
