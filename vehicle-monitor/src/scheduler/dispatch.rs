/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Ready queue for the preemptive kernel.
//!
//! Highest numeric priority first; among equal priorities, the task that
//! became ready first goes first.  The activation sequence number is handed
//! out by the queue itself so FIFO order is exact even when several tasks
//! are released in the same tick.
//!
//! The kernel keeps the sequence number of each task's live entry; an entry
//! whose number no longer matches is stale and is skipped.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEntry {
    pub priority: i32,
    pub seq: u64,
    pub id: usize,
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            // lower sequence number = earlier activation = greater
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority-ordered, FIFO-within-priority queue of task ids.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
    next_seq: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `id` and return the sequence number of its entry.
    pub fn push(&mut self, id: usize, priority: i32) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ReadyEntry { priority, seq, id });
        seq
    }

    /// The entry that would run next.
    pub fn peek(&self) -> Option<ReadyEntry> {
        self.heap.peek().copied()
    }

    /// Remove and return the entry that should run next.
    pub fn pop(&mut self) -> Option<ReadyEntry> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
