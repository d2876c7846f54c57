/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Channel error types.
//!
//! Every variant here is **recoverable**: the caller decides whether to
//! retry, back off or drop.  A failed send hands the undelivered message
//! back so nothing is lost silently.

use std::fmt;

use thiserror::Error;

// ── Send ──────────────────────────────────────────────────────────────────────

/// Why a message could not be enqueued.  Carries the message back.
///
/// `Display` / `Error` are written by hand (like `HyperperiodError`) so that
/// no `Debug` bound is placed on the payload type.
pub enum SendError<T> {
    /// Non-blocking send found the queue at capacity.
    Full(T),

    /// Bounded-wait send gave up before space became available.
    TimedOut(T),

    /// The receiving end has been dropped.
    Disconnected(T),
}

impl<T> SendError<T> {
    /// Recover the message that was not sent.
    pub fn into_inner(self) -> T {
        match self {
            SendError::Full(m) | SendError::TimedOut(m) | SendError::Disconnected(m) => m,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SendError::Full(_))
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, SendError::Disconnected(_))
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Full(_) => f.write_str("Full(..)"),
            SendError::TimedOut(_) => f.write_str("TimedOut(..)"),
            SendError::Disconnected(_) => f.write_str("Disconnected(..)"),
        }
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Full(_) => write!(f, "channel is full"),
            SendError::TimedOut(_) => write!(f, "timed out waiting for channel space"),
            SendError::Disconnected(_) => write!(f, "receiver disconnected"),
        }
    }
}

impl<T> std::error::Error for SendError<T> {}

// ── Receive ───────────────────────────────────────────────────────────────────

/// Why no message was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    /// Non-blocking receive found nothing queued.
    #[error("channel is empty")]
    Empty,

    /// Timed receive elapsed with nothing queued.
    #[error("timed out waiting for a message")]
    TimedOut,

    /// Every sender has been dropped and the queue is drained.
    #[error("all senders disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_inner_returns_the_message() {
        assert_eq!(SendError::Full(7).into_inner(), 7);
        assert_eq!(SendError::TimedOut("a").into_inner(), "a");
        assert_eq!(SendError::Disconnected(vec![1]).into_inner(), vec![1]);
    }

    #[test]
    fn display_does_not_need_payload_debug() {
        struct Opaque;
        let e = SendError::Full(Opaque);
        assert_eq!(e.to_string(), "channel is full");
        assert_eq!(format!("{e:?}"), "Full(..)");
    }
}
