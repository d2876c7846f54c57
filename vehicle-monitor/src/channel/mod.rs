/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Bounded FIFO channel for cross-task messages.
//!
//! ```text
//! producer task ──send──►  [ m1 | m2 | … | mC ]  ──receive──►  reporter task
//!                          capacity C, strict FIFO
//! ```
//!
//! Built on `crossbeam::channel::bounded`.  The wrapper adds two things:
//!
//! * The error vocabulary of this crate ([`SendError`] / [`RecvError`]).
//! * Scheduler awareness: every send and receive starts at a
//!   [`preemption_point`], and when a blocking operation actually has to
//!   wait it runs inside [`blocking_section`].  Under the preemptive kernel
//!   the calling task is marked `Blocked` and gives up the CPU for the
//!   duration of the wait.  Under the cyclic executive the whole loop simply
//!   stalls.
//!
//! Ordering is strictly FIFO.  Priority lives on tasks, never on messages.

pub mod error;

pub use error::{RecvError, SendError};

use std::num::NonZeroUsize;
use std::time::Duration;

use crossbeam::channel::{self as cb, RecvTimeoutError, SendTimeoutError, TryRecvError, TrySendError};

use crate::scheduler::{blocking_section, preemption_point, BlockReason};

/// Create a bounded channel holding at most `capacity` in-flight messages.
pub fn bounded<T>(capacity: NonZeroUsize) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = cb::bounded(capacity.get());
    (Sender { inner: tx }, Receiver { inner: rx })
}

// ── Send policy ───────────────────────────────────────────────────────────────

/// How a producer waits when the queue is full.
///
/// `Block` waits with no upper bound.  A producer parked on a queue whose
/// consumer never runs again stays parked until the consumer is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPolicy {
    #[default]
    Block,
    Timeout(Duration),
}

// ── Sender ────────────────────────────────────────────────────────────────────

/// Producer endpoint.  Cheap to clone; every clone feeds the same queue.
#[derive(Debug)]
pub struct Sender<T> {
    inner: cb::Sender<T>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Sender<T> {
    /// Enqueue without waiting.  Fails with [`SendError::Full`] when `C`
    /// messages are already in flight.
    pub fn try_send(&self, msg: T) -> Result<(), SendError<T>> {
        preemption_point();
        self.inner.try_send(msg).map_err(|e| match e {
            TrySendError::Full(m) => SendError::Full(m),
            TrySendError::Disconnected(m) => SendError::Disconnected(m),
        })
    }

    /// Enqueue, waiting as long as it takes for space.
    ///
    /// Only fails when the receiver is gone.
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        match self.try_send(msg) {
            Err(SendError::Full(msg)) => blocking_section(BlockReason::ChannelFull, || {
                self.inner
                    .send(msg)
                    .map_err(|cb::SendError(m)| SendError::Disconnected(m))
            }),
            other => other,
        }
    }

    /// Enqueue, waiting at most `timeout` for space.
    pub fn send_timeout(&self, msg: T, timeout: Duration) -> Result<(), SendError<T>> {
        match self.try_send(msg) {
            Err(SendError::Full(msg)) => blocking_section(BlockReason::ChannelFull, || {
                self.inner.send_timeout(msg, timeout).map_err(|e| match e {
                    SendTimeoutError::Timeout(m) => SendError::TimedOut(m),
                    SendTimeoutError::Disconnected(m) => SendError::Disconnected(m),
                })
            }),
            other => other,
        }
    }

    /// Enqueue according to `policy`.
    pub fn send_with(&self, msg: T, policy: SendPolicy) -> Result<(), SendError<T>> {
        match policy {
            SendPolicy::Block => self.send(msg),
            SendPolicy::Timeout(d) => self.send_timeout(msg, d),
        }
    }

    /// Messages currently in flight.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn capacity(&self) -> usize {
        // bounded() always sets a capacity
        self.inner.capacity().unwrap_or(0)
    }
}

// ── Receiver ──────────────────────────────────────────────────────────────────

/// Consumer endpoint.  Deliberately not `Clone`: each channel has exactly one
/// consumer task.
#[derive(Debug)]
pub struct Receiver<T> {
    inner: cb::Receiver<T>,
}

impl<T> Receiver<T> {
    /// Dequeue without waiting.
    pub fn try_receive(&self) -> Result<T, RecvError> {
        preemption_point();
        self.inner.try_recv().map_err(|e| match e {
            TryRecvError::Empty => RecvError::Empty,
            TryRecvError::Disconnected => RecvError::Disconnected,
        })
    }

    /// Dequeue, waiting up to `timeout` (`None` = forever).
    ///
    /// Messages still queued when the senders disconnect are delivered before
    /// [`RecvError::Disconnected`] is reported.
    pub fn receive(&self, timeout: Option<Duration>) -> Result<T, RecvError> {
        match self.try_receive() {
            Err(RecvError::Empty) => {}
            other => return other,
        }

        blocking_section(BlockReason::ChannelEmpty, || match timeout {
            None => self.inner.recv().map_err(|_| RecvError::Disconnected),
            Some(d) => self.inner.recv_timeout(d).map_err(|e| match e {
                RecvTimeoutError::Timeout => RecvError::TimedOut,
                RecvTimeoutError::Disconnected => RecvError::Disconnected,
            }),
        })
    }

    /// Take everything currently queued without waiting, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.inner.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().unwrap_or(0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
