/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Monotonic time sources for the schedulers.
//!
//! All timestamps in the crate are a `Duration` measured from the clock's own
//! origin, never wall-clock time.  The cyclic executive only ever asks the
//! clock to `sleep` one tick, so swapping [`MonotonicClock`] for a
//! [`ManualClock`] makes a run fully deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time source shared between a scheduler and the tasks it drives.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Block the calling thread for `d`.
    fn sleep(&self, d: Duration);
}

// ── MonotonicClock ────────────────────────────────────────────────────────────

/// Real time, backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

// ── ManualClock ───────────────────────────────────────────────────────────────

/// Virtual time.  `sleep` advances the clock instead of blocking.
///
/// Microsecond resolution; stored in an atomic so the clock can be shared
/// (`Arc<ManualClock>`) between a scheduler and the work it runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward by `d`.
    pub fn advance(&self, d: Duration) {
        let us = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
        self.now_us.fetch_add(us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.now_us.load(Ordering::SeqCst))
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
