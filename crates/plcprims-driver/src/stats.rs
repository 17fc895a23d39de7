use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Session counters, updated lock-free from callers and the inbound task.
#[derive(Debug, Default)]
pub struct DriverStats {
    commands_sent: AtomicU64,
    replies_resolved: AtomicU64,
    orphan_responses: AtomicU64,
    malformed_replies: AtomicU64,
    timeouts: AtomicU64,
    withdrawn: AtomicU64,
}

/// Point-in-time copy of [`DriverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub commands_sent: u64,
    pub replies_resolved: u64,
    /// Replies whose transaction id had no pending entry.
    pub orphan_responses: u64,
    /// Replies that could not be parsed far enough to correlate.
    pub malformed_replies: u64,
    pub timeouts: u64,
    /// Entries removed because the caller stopped waiting.
    pub withdrawn: u64,
}

impl DriverStats {
    pub(crate) fn command_sent(&self) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reply_resolved(&self) {
        self.replies_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn orphan(&self) {
        self.orphan_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn malformed(&self) {
        self.malformed_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn withdrawn(&self) {
        self.withdrawn.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            replies_resolved: self.replies_resolved.load(Ordering::Relaxed),
            orphan_responses: self.orphan_responses.load(Ordering::Relaxed),
            malformed_replies: self.malformed_replies.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            withdrawn: self.withdrawn.load(Ordering::Relaxed),
        }
    }
}
