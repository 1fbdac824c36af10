//! Deployment reconciliation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use singularity_wire::{RequestParent, RequestState, SingularityDeploy};

use crate::api::SingularityClient;
use crate::config::ReconcileSettings;
use crate::deploy::Deployment;
use crate::poll::{ConvergencePoller, PollOutcome, Probe};
use crate::state::ConvergenceTracker;

use super::error::{ReconcileError, ReconcileResult};
use super::remote_error;

/// Where a deployment sits in its job's deploy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployState {
    Pending,
    Active,
}

/// Locally recorded deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployment: Deployment,
    pub deploy_state: DeployState,
}

impl DeploymentRecord {
    pub fn id(&self) -> &str {
        &self.deployment.id
    }

    pub fn job_id(&self) -> &str {
        &self.deployment.job_id
    }

    /// Pick a deploy out of a job read.
    ///
    /// With `deploy_id`, only that deploy matches. Without it the active deploy
    /// wins and the pending one is the fallback.
    pub fn from_parent(parent: &RequestParent, deploy_id: Option<&str>) -> ReconcileResult<Option<Self>> {
        let slot = |deploy: &Option<SingularityDeploy>| {
            deploy
                .as_ref()
                .filter(|d| !d.id.is_empty())
                .filter(|d| deploy_id.map_or(true, |id| d.id == id))
                .cloned()
        };
        let found = match slot(&parent.active_deploy) {
            Some(deploy) => Some((deploy, DeployState::Active)),
            None => slot(&parent.pending_deploy).map(|deploy| (deploy, DeployState::Pending)),
        };
        match found {
            Some((deploy, deploy_state)) => Ok(Some(Self {
                deployment: Deployment::from_wire(&deploy)?,
                deploy_state,
            })),
            None => Ok(None),
        }
    }
}

/// Exists/Read/Create/Update/Delete/Import for deployments
#[derive(Debug, Clone, Default)]
pub struct DeploymentReconciler {
    settings: ReconcileSettings,
}

impl DeploymentReconciler {
    pub fn new(settings: ReconcileSettings) -> Self {
        Self { settings }
    }

    fn fetch_job(&self, client: &SingularityClient, job_id: &str) -> ReconcileResult<Option<RequestParent>> {
        let (response, parent) = client.get_job(job_id)?;
        if response.is_not_found() {
            return Ok(None);
        }
        parent.map(Some).ok_or_else(|| remote_error(&response))
    }

    /// Whether the recorded deploy is still the active or pending deploy of its job.
    ///
    /// A paused job fails with [`ReconcileError::Paused`]. A job in cooldown
    /// or already deleted takes its deploys with it.
    pub fn exists(&self, client: &SingularityClient, record: &DeploymentRecord) -> ReconcileResult<bool> {
        let Some(parent) = self.fetch_job(client, record.job_id())? else {
            debug!(job_id = %record.job_id(), "job of deploy not found");
            return Ok(false);
        };
        match parent.state {
            RequestState::Paused => Err(ReconcileError::Paused {
                job_id: record.job_id().to_string(),
            }),
            RequestState::SystemCooldown | RequestState::Deleted => {
                debug!(job_id = %record.job_id(), state = %parent.state, "job of deploy will not keep it");
                Ok(false)
            }
            _ => Ok(parent.tracks_deploy(record.id())),
        }
    }

    /// Read a job's deploy, falling back to the pending deploy when nothing is active.
    pub fn read(
        &self,
        client: &SingularityClient,
        job_id: &str,
        deploy_id: Option<&str>,
    ) -> ReconcileResult<DeploymentRecord> {
        let parent = self.fetch_job(client, job_id)?.ok_or_else(|| ReconcileError::NotFound {
            resource: "job",
            id: job_id.to_string(),
        })?;
        DeploymentRecord::from_parent(&parent, deploy_id)?.ok_or_else(|| ReconcileError::NotFound {
            resource: "deploy",
            id: deploy_id.unwrap_or(job_id).to_string(),
        })
    }

    /// Submit `desired` under its content fingerprint and wait until it is active.
    ///
    /// Validation runs before any request is sent. Submitting content that is
    /// already the job's active or pending deploy sends nothing new.
    pub fn create(&self, client: &SingularityClient, desired: &Deployment) -> ReconcileResult<DeploymentRecord> {
        desired.validate()?;
        let keyed = desired.with_fingerprint_id()?;
        let job_id = keyed.job_id.as_str();
        let deploy_id = keyed.id.as_str();

        let parent = self.fetch_job(client, job_id)?.ok_or_else(|| ReconcileError::NotFound {
            resource: "job",
            id: job_id.to_string(),
        })?;
        if parent.active_deploy_id() == Some(deploy_id) {
            info!(job_id, deploy_id, "deploy already active");
            return self.read(client, job_id, Some(deploy_id));
        }
        if parent.pending_deploy_id() == Some(deploy_id) {
            info!(job_id, deploy_id, "deploy already pending");
        } else {
            let response = client.create_deploy(&keyed.to_request())?;
            if !response.is_success() {
                return Err(remote_error(&response));
            }
            info!(job_id, deploy_id, "deploy submitted");
        }

        self.await_active(client, &keyed)
    }

    fn await_active(&self, client: &SingularityClient, keyed: &Deployment) -> ReconcileResult<DeploymentRecord> {
        let job_id = keyed.job_id.as_str();
        let deploy_id = keyed.id.as_str();
        let mut tracker = ConvergenceTracker::submitted(job_id, deploy_id);
        let poller = ConvergencePoller::new(self.settings.convergence);

        let outcome = poller.poll(|_| -> ReconcileResult<Probe<RequestParent>> {
            let (response, parent) = client.get_job(job_id)?;
            let parent = parent.ok_or_else(|| remote_error(&response))?;
            let still_pending = parent.pending_deploy_id() == Some(deploy_id);
            tracker.observe(still_pending)?;
            Ok(if still_pending {
                Probe::NotYet(parent)
            } else {
                Probe::Ready(parent)
            })
        })?;

        match outcome {
            PollOutcome::Converged { value, attempts } => {
                if value.active_deploy_id() != Some(deploy_id) {
                    warn!(job_id, deploy_id, active = ?value.active_deploy_id(), "deploy left pending but is not active");
                    return Err(ReconcileError::DeployFailed {
                        job_id: job_id.to_string(),
                        deploy_id: deploy_id.to_string(),
                    });
                }
                info!(job_id, deploy_id, attempts, "deploy active");
                self.read(client, job_id, Some(deploy_id))
            }
            PollOutcome::TimedOut { last, attempts } => {
                tracker.time_out()?;
                let observed = match &last {
                    Some(parent) => DeploymentRecord::from_parent(parent, Some(deploy_id))?,
                    None => None,
                };
                let record = observed.unwrap_or_else(|| DeploymentRecord {
                    deployment: keyed.clone(),
                    deploy_state: DeployState::Pending,
                });
                warn!(job_id, deploy_id, attempts, "deploy did not converge");
                Err(ReconcileError::ConvergenceTimeout {
                    job_id: job_id.to_string(),
                    deploy_id: deploy_id.to_string(),
                    attempts,
                    record: Box::new(record),
                })
            }
        }
    }

    /// Move from `current` to `desired`.
    ///
    /// The owning job cannot change. Changed content is rolled out as a new
    /// deploy with a new id.
    pub fn update(
        &self,
        client: &SingularityClient,
        current: &DeploymentRecord,
        desired: &Deployment,
    ) -> ReconcileResult<DeploymentRecord> {
        if current.job_id() != desired.job_id {
            return Err(ReconcileError::ImmutableField {
                field: "job_id",
                from: current.job_id().to_string(),
                to: desired.job_id.clone(),
            });
        }
        if current.deployment.same_content(desired) {
            debug!(job_id = %desired.job_id, deploy_id = %current.id(), "deploy unchanged");
            return Ok(current.clone());
        }
        info!(job_id = %desired.job_id, previous = %current.id(), "deploy content changed");
        self.create(client, desired)
    }

    /// Roll `desired` out on its job, updating whatever deploy the job
    /// currently tracks.
    pub fn apply(&self, client: &SingularityClient, desired: &Deployment) -> ReconcileResult<DeploymentRecord> {
        match self.read(client, &desired.job_id, None) {
            Ok(current) => self.update(client, &current, desired),
            Err(ReconcileError::NotFound { resource: "deploy", .. }) => self.create(client, desired),
            Err(err) => Err(err),
        }
    }

    /// Remove the deploy: cancel it while pending, delete the owning job once active.
    pub fn delete(&self, client: &SingularityClient, record: &DeploymentRecord) -> ReconcileResult<()> {
        let job_id = record.job_id();
        let deploy_id = record.id();
        let Some(parent) = self.fetch_job(client, job_id)? else {
            debug!(job_id, deploy_id, "job already gone");
            return Ok(());
        };

        let response = if parent.pending_deploy_id() == Some(deploy_id) {
            info!(job_id, deploy_id, "cancelling pending deploy");
            client.cancel_pending_deploy(deploy_id, job_id)?
        } else if parent.active_deploy_id() == Some(deploy_id) {
            info!(job_id, deploy_id, "deleting job of active deploy");
            client.delete_job(job_id)?
        } else {
            debug!(job_id, deploy_id, "deploy no longer tracked");
            return Ok(());
        };

        if response.is_success() || response.is_not_found() {
            Ok(())
        } else {
            Err(remote_error(&response))
        }
    }

    /// Adopt an existing deploy by id, searching every job.
    pub fn import(&self, client: &SingularityClient, deploy_id: &str) -> ReconcileResult<DeploymentRecord> {
        let (response, parents) = client.list_jobs()?;
        let parents = parents.ok_or_else(|| remote_error(&response))?;
        for parent in &parents {
            if let Some(record) = DeploymentRecord::from_parent(parent, Some(deploy_id))? {
                info!(job_id = %record.job_id(), deploy_id, "deploy imported");
                return Ok(record);
            }
        }
        Err(ReconcileError::NotFound {
            resource: "deploy",
            id: deploy_id.to_string(),
        })
    }
}
