use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Session counters, shared between the receiving and processing threads.
#[derive(Debug, Default)]
pub struct Statistics {
    observed: AtomicU64,
    captured: AtomicU64,
    dropped: AtomicU64,
}

impl Statistics {
    pub fn increment_observed(&self) {
        self.observed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            observed: self.observed.load(Ordering::Relaxed),
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StatisticsSnapshot {
    /// Frames received from the socket.
    pub observed: u64,
    /// Frames handed to the output.
    pub captured: u64,
    /// Frames lost because the queue was full.
    pub dropped: u64,
}

impl Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Observed: {}. Captured: {}. Dropped: {}.",
            self.observed, self.captured, self.dropped
        )
    }
}
