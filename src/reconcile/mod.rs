//! Resource Reconciler
//!
//! Drives the scheduler from a desired job or deployment definition through
//! Exists, Read, Create, Update, Delete and Import. Every operation takes the
//! client explicitly; reconcilers only carry timing settings.

mod deploy;
mod diff;
mod error;
mod job;

use std::time::Duration;

use crate::api::ApiResponse;

pub use deploy::{DeployState, DeploymentReconciler, DeploymentRecord};
pub use diff::{immutable_changes, plan_job_update, JobUpdatePlan};
pub use error::{FailureKind, ReconcileError, ReconcileResult};
pub use job::{JobReconciler, JobRecord};

/// Delay between deleting a job and recreating it under the same id
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(30);

/// Map a non-success response to an error.
pub(crate) fn remote_error(response: &ApiResponse) -> ReconcileError {
    ReconcileError::Remote {
        status: response.status,
        body: response.body.clone(),
    }
}
