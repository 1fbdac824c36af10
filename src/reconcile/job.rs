//! Job reconciliation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use singularity_wire::RequestState;

use crate::api::SingularityClient;
use crate::config::ReconcileSettings;
use crate::job::{normalize_job_id, Job};
use crate::state::{RecreatePhase, RecreateTracker};

use super::diff::{plan_job_update, JobUpdatePlan};
use super::error::{ReconcileError, ReconcileResult};
use super::remote_error;

/// Locally recorded job plus reconciliation flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job: Job,
    /// Set when the scheduler put the job in cooldown; the next apply recreates it.
    #[serde(default)]
    pub needs_recreate: bool,
}

impl JobRecord {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            needs_recreate: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.job.id
    }
}

/// Exists/Read/Create/Update/Delete/Import for jobs
#[derive(Debug, Clone, Default)]
pub struct JobReconciler {
    settings: ReconcileSettings,
}

impl JobReconciler {
    pub fn new(settings: ReconcileSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Whether the recorded job exists remotely.
    ///
    /// A paused job fails with [`ReconcileError::Paused`], for which
    /// `resource_exists()` is true. A job in cooldown is reported absent and
    /// `record` is flagged for recreation.
    pub fn exists(&self, client: &SingularityClient, record: &mut JobRecord) -> ReconcileResult<bool> {
        let (response, parent) = client.get_job(record.id())?;
        if response.is_not_found() {
            debug!(job_id = %record.id(), "job not found");
            return Ok(false);
        }
        let parent = parent.ok_or_else(|| remote_error(&response))?;

        match parent.state {
            RequestState::Paused => Err(ReconcileError::Paused {
                job_id: record.id().to_string(),
            }),
            RequestState::SystemCooldown => {
                warn!(job_id = %record.id(), "job in system cooldown, scheduling recreate");
                record.needs_recreate = true;
                Ok(false)
            }
            RequestState::Deleted => Ok(false),
            _ => Ok(true),
        }
    }

    /// Fetch the remote job and map it back into the local model.
    pub fn read(&self, client: &SingularityClient, job_id: &str) -> ReconcileResult<JobRecord> {
        let job_id = normalize_job_id(job_id)?;
        let (response, parent) = client.get_job(&job_id)?;
        if response.is_not_found() {
            return Err(ReconcileError::NotFound {
                resource: "job",
                id: job_id,
            });
        }
        let parent = parent.ok_or_else(|| remote_error(&response))?;
        let job = Job::from_wire(&parent.request, Some(parent.state))?;
        Ok(JobRecord {
            job,
            needs_recreate: parent.state == RequestState::SystemCooldown,
        })
    }

    /// Submit `desired` and read it back.
    pub fn create(&self, client: &SingularityClient, desired: &Job) -> ReconcileResult<JobRecord> {
        desired.validate()?;
        let response = desired.create(client)?;
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        info!(job_id = %desired.id, kind = %desired.kind(), "job created");
        self.read(client, &desired.id)
    }

    /// Move the remote job from `current` to `desired`.
    ///
    /// Instance-only changes scale in place; any immutable change deletes,
    /// waits for the settle delay, then creates.
    pub fn update(
        &self,
        client: &SingularityClient,
        current: &JobRecord,
        desired: &Job,
    ) -> ReconcileResult<JobRecord> {
        desired.validate()?;
        let plan = if current.needs_recreate {
            JobUpdatePlan::Recreate {
                changed: vec!["state"],
            }
        } else {
            plan_job_update(&current.job, desired)
        };

        match plan {
            JobUpdatePlan::Unchanged => {
                debug!(job_id = %desired.id, "job unchanged");
                self.read(client, &desired.id)
            }
            JobUpdatePlan::Scale { instances } => {
                let response = client.scale_job(&desired.id, instances)?;
                if !response.is_success() {
                    return Err(remote_error(&response));
                }
                info!(job_id = %desired.id, from = ?current.job.instances(), to = instances, "job scaled");
                self.read(client, &desired.id)
            }
            JobUpdatePlan::Recreate { changed } => {
                info!(job_id = %current.id(), changed = ?changed, "job requires recreate");
                self.recreate(client, current.id(), desired)
            }
        }
    }

    fn recreate(&self, client: &SingularityClient, old_id: &str, desired: &Job) -> ReconcileResult<JobRecord> {
        let mut tracker = RecreateTracker::new(old_id, self.settings.settle);
        let mut record = None;
        while tracker.phase != RecreatePhase::Done {
            match tracker.phase {
                RecreatePhase::Deleting => self.delete(client, old_id)?,
                RecreatePhase::Settling => tracker.settle(),
                RecreatePhase::Recreating => record = Some(self.create(client, desired)?),
                RecreatePhase::Done => {}
            }
            tracker.advance();
        }
        match record {
            Some(record) => Ok(record),
            None => self.read(client, &desired.id),
        }
    }

    /// Bring the remote job in line with `desired`.
    ///
    /// An existing job is updated. A job in cooldown is deleted and created
    /// again. An absent job is created.
    pub fn apply(&self, client: &SingularityClient, desired: &Job) -> ReconcileResult<JobRecord> {
        let mut record = JobRecord::new(desired.clone());
        if self.exists(client, &mut record)? {
            let current = self.read(client, &desired.id)?;
            self.update(client, &current, desired)
        } else if record.needs_recreate {
            self.update(client, &record, desired)
        } else {
            self.create(client, desired)
        }
    }

    /// Delete the job. A job that is already gone counts as deleted.
    pub fn delete(&self, client: &SingularityClient, job_id: &str) -> ReconcileResult<()> {
        let response = client.delete_job(job_id)?;
        if response.is_not_found() {
            debug!(job_id, "job already deleted");
            return Ok(());
        }
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        info!(job_id, "job deleted");
        Ok(())
    }

    /// Adopt an existing remote job by id.
    pub fn import(&self, client: &SingularityClient, job_id: &str) -> ReconcileResult<JobRecord> {
        let record = self.read(client, job_id)?;
        info!(job_id = %record.id(), kind = %record.job.kind(), "job imported");
        Ok(record)
    }
}
