//! Update planning for jobs.

use crate::job::Job;

/// How to move a job from its current definition to the desired one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdatePlan {
    /// Nothing to send.
    Unchanged,
    /// Only the instance count differs; adjust in place.
    Scale { instances: u32 },
    /// An immutable field differs; delete, settle, create.
    Recreate { changed: Vec<&'static str> },
}

/// Immutable fields whose values differ between `current` and `desired`.
pub fn immutable_changes(current: &Job, desired: &Job) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if current.id != desired.id {
        changed.push("id");
    }
    if current.kind() != desired.kind() {
        changed.push("type");
    }
    if current.schedule() != desired.schedule() {
        changed.push("schedule");
    }
    if current.schedule_kind() != desired.schedule_kind() {
        changed.push("schedule_type");
    }
    if current.retries() != desired.retries() {
        changed.push("num_retries_on_failure");
    }
    if current.slave_placement != desired.slave_placement {
        changed.push("slave_placement");
    }
    changed
}

/// Decide the update path.
///
/// An absent desired instance count leaves the remote count alone.
pub fn plan_job_update(current: &Job, desired: &Job) -> JobUpdatePlan {
    let changed = immutable_changes(current, desired);
    if !changed.is_empty() {
        return JobUpdatePlan::Recreate { changed };
    }
    match desired.instances() {
        Some(instances) if current.instances() != Some(instances) => JobUpdatePlan::Scale { instances },
        _ => JobUpdatePlan::Unchanged,
    }
}
