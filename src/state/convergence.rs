//! Deploy convergence state machine
//!
//! A submitted deploy is acknowledged before it is placed; it stays PENDING
//! until the job's pending-deploy marker clears.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::TerminalState;

/// Convergence state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvergenceState {
    /// Deploy accepted by the scheduler, not yet observed
    Submitted,
    /// Observed as the job's pending deploy
    Pending,
    /// Observed as the job's active deploy
    Active,
    /// Poll attempts exhausted while still pending
    Timeout,
}

impl TerminalState for ConvergenceState {
    fn is_terminal(&self) -> bool {
        matches!(self, ConvergenceState::Active | ConvergenceState::Timeout)
    }
}

impl ConvergenceState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: ConvergenceState) -> bool {
        matches!(
            (self, target),
            (ConvergenceState::Submitted, ConvergenceState::Pending)
                | (ConvergenceState::Pending, ConvergenceState::Active)
                | (ConvergenceState::Pending, ConvergenceState::Timeout)
        )
    }
}

/// Errors for convergence tracking
#[derive(Debug, thiserror::Error)]
pub enum ConvergenceError {
    #[error("Invalid convergence transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConvergenceState,
        to: ConvergenceState,
    },
}

/// Convergence progress of one deploy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceTracker {
    pub job_id: String,
    pub deploy_id: String,
    pub state: ConvergenceState,
    /// Polls performed so far
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl ConvergenceTracker {
    /// Start tracking a freshly submitted deploy
    pub fn submitted(job_id: impl Into<String>, deploy_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            deploy_id: deploy_id.into(),
            state: ConvergenceState::Submitted,
            attempts: 0,
            updated_at: Utc::now(),
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: ConvergenceState) -> Result<(), ConvergenceError> {
        if !self.state.can_transition_to(new_state) {
            return Err(ConvergenceError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }
        info!(
            job_id = %self.job_id,
            deploy_id = %self.deploy_id,
            from = ?self.state,
            to = ?new_state,
            attempts = self.attempts,
            "deploy convergence"
        );
        self.state = new_state;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record one poll observation.
    ///
    /// `still_pending` is whether the job's pending deploy is still this deploy.
    pub fn observe(&mut self, still_pending: bool) -> Result<ConvergenceState, ConvergenceError> {
        self.attempts += 1;
        if self.state == ConvergenceState::Submitted {
            self.transition(ConvergenceState::Pending)?;
        }
        if !still_pending {
            self.transition(ConvergenceState::Active)?;
        }
        Ok(self.state)
    }

    /// Give up waiting.
    pub fn time_out(&mut self) -> Result<(), ConvergenceError> {
        if self.state == ConvergenceState::Submitted {
            self.transition(ConvergenceState::Pending)?;
        }
        self.transition(ConvergenceState::Timeout)
    }
}
