/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-window running average.
//!
//! A [`RunningAverage`] collects exactly `capacity` samples, emits their
//! arithmetic mean on the sample that fills the window, and starts over
//! empty.  It is a tumbling window, not a sliding one: consecutive means
//! never share a sample.

use std::num::NonZeroUsize;

/// Tumbling-window mean over `capacity` samples.
#[derive(Debug, Clone)]
pub struct RunningAverage {
    buffer: Vec<f64>,
    capacity: NonZeroUsize,
}

impl RunningAverage {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Append one sample.
    ///
    /// Returns `Some(mean)` when this sample fills the window; the window is
    /// cleared before returning, so the next push starts a fresh accumulation
    /// with a count of 1.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.buffer.push(value);
        if self.buffer.len() < self.capacity.get() {
            return None;
        }

        let sum: f64 = self.buffer.iter().sum();
        let mean = sum / self.buffer.len() as f64;
        self.buffer.clear();
        Some(mean)
    }

    /// Samples accumulated in the current window.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
