//! Reconciler error taxonomy and exit-code mapping.

use thiserror::Error;

use crate::api::ClientError;
use crate::deploy::DeployError;
use crate::job::JobError;
use crate::state::ConvergenceError;

use super::deploy::DeploymentRecord;

/// Failure kind for exit code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Caller's fault, detected before any network call (exit code 10)
    Validation = 10,
    /// No response from the scheduler (exit code 20)
    Transport = 20,
    /// Scheduler answered with an error (exit code 30)
    Remote = 30,
    /// Job is paused or cooling down (exit code 40)
    StateConflict = 40,
    /// Deploy did not become active in time (exit code 50)
    Convergence = 50,
    /// Configuration or manifest problem (exit code 60)
    Config = 60,
}

/// Reconciler errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("job '{job_id}' is paused; unpause it before reconciling")]
    Paused { job_id: String },

    #[error("job '{job_id}' is in system cooldown")]
    Cooldown { job_id: String },

    #[error("deploy '{deploy_id}' of job '{job_id}' still pending after {attempts} checks")]
    ConvergenceTimeout {
        job_id: String,
        deploy_id: String,
        attempts: u32,
        /// Last observed state, to be persisted by the caller
        record: Box<DeploymentRecord>,
    },

    #[error("deploy '{deploy_id}' of job '{job_id}' left pending without becoming active")]
    DeployFailed { job_id: String, deploy_id: String },

    #[error("field {field} cannot change ('{from}' -> '{to}')")]
    ImmutableField {
        field: &'static str,
        from: String,
        to: String,
    },

    #[error("scheduler returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error(transparent)]
    Convergence(#[from] ConvergenceError),
}

impl ReconcileError {
    /// Map error to failure kind for exit code
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ReconcileError::Job(JobError::Client(_)) => FailureKind::Transport,
            ReconcileError::Deploy(DeployError::Client(_)) => FailureKind::Transport,
            ReconcileError::Client(ClientError::Transport { .. }) => FailureKind::Transport,
            ReconcileError::Client(_) => FailureKind::Remote,
            ReconcileError::Job(_) => FailureKind::Validation,
            ReconcileError::Deploy(_) => FailureKind::Validation,
            ReconcileError::Validation(_) => FailureKind::Validation,
            ReconcileError::ImmutableField { .. } => FailureKind::Validation,
            ReconcileError::NotFound { .. } => FailureKind::Remote,
            ReconcileError::Remote { .. } => FailureKind::Remote,
            ReconcileError::DeployFailed { .. } => FailureKind::Remote,
            ReconcileError::Paused { .. } => FailureKind::StateConflict,
            ReconcileError::Cooldown { .. } => FailureKind::StateConflict,
            ReconcileError::ConvergenceTimeout { .. } => FailureKind::Convergence,
            ReconcileError::Convergence(_) => FailureKind::Convergence,
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.failure_kind() as i32
    }

    /// Whether the resource is known to exist despite the error.
    ///
    /// True for a paused job: it exists, but must not be reconciled.
    pub fn resource_exists(&self) -> bool {
        matches!(self, ReconcileError::Paused { .. })
    }

    /// Last observed deployment carried by a convergence timeout
    pub fn partial_record(&self) -> Option<&DeploymentRecord> {
        match self {
            ReconcileError::ConvergenceTimeout { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Result type for reconciler operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
