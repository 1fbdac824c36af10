//! Delete-then-recreate state machine
//!
//! Immutable job fields cannot be changed in place. The old job is deleted,
//! the scheduler is given a settle delay to finish removing it, then the
//! job is created again.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::TerminalState;

/// Recreate phase enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecreatePhase {
    Deleting,
    Settling,
    Recreating,
    Done,
}

impl TerminalState for RecreatePhase {
    fn is_terminal(&self) -> bool {
        matches!(self, RecreatePhase::Done)
    }
}

impl RecreatePhase {
    /// The only phase this one may advance to.
    pub fn next(&self) -> Option<RecreatePhase> {
        match self {
            RecreatePhase::Deleting => Some(RecreatePhase::Settling),
            RecreatePhase::Settling => Some(RecreatePhase::Recreating),
            RecreatePhase::Recreating => Some(RecreatePhase::Done),
            RecreatePhase::Done => None,
        }
    }
}

/// Progress of one delete-then-recreate
#[derive(Debug, Clone)]
pub struct RecreateTracker {
    pub job_id: String,
    pub phase: RecreatePhase,
    pub settle: Duration,
}

impl RecreateTracker {
    pub fn new(job_id: impl Into<String>, settle: Duration) -> Self {
        Self {
            job_id: job_id.into(),
            phase: RecreatePhase::Deleting,
            settle,
        }
    }

    /// Move to the next phase, returning it. Stays at `Done`.
    pub fn advance(&mut self) -> RecreatePhase {
        if let Some(next) = self.phase.next() {
            info!(job_id = %self.job_id, from = ?self.phase, to = ?next, "job recreate");
            self.phase = next;
        }
        self.phase
    }

    /// Block for the settle delay. Only meaningful while settling.
    pub fn settle(&self) {
        if self.phase == RecreatePhase::Settling && !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut tracker = RecreateTracker::new("nightly", Duration::ZERO);
        assert_eq!(tracker.phase, RecreatePhase::Deleting);
        assert_eq!(tracker.advance(), RecreatePhase::Settling);
        assert_eq!(tracker.advance(), RecreatePhase::Recreating);
        assert_eq!(tracker.advance(), RecreatePhase::Done);
        assert_eq!(tracker.advance(), RecreatePhase::Done);
        assert!(tracker.phase.is_terminal());
    }

    #[test]
    fn test_settle_sleeps_only_while_settling() {
        let tracker = RecreateTracker::new("nightly", Duration::from_secs(3600));
        // Deleting: returns immediately
        tracker.settle();

        let mut tracker = RecreateTracker::new("nightly", Duration::from_millis(20));
        tracker.advance();
        let start = std::time::Instant::now();
        tracker.settle();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
