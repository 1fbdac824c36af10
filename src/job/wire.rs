//! Conversion between jobs and request payloads.

use tracing::debug;

use singularity_wire::{RequestState, RequestType, ScheduleType, SingularityRequest};

use crate::api::{ApiResponse, SingularityClient};

use super::{normalize_job_id, Job, JobError, JobKind, JobSpec, ACCEPTED_SCHEDULE_KIND};

impl Job {
    /// Build the request payload. Fails if submission invariants do not hold.
    pub fn to_wire(&self) -> Result<SingularityRequest, JobError> {
        self.validate()?;

        let mut request = SingularityRequest {
            id: self.id.clone(),
            request_type: RequestType::from(self.kind()),
            instances: None,
            num_retries_on_failure: None,
            schedule: None,
            schedule_type: None,
            slave_placement: Some(self.slave_placement),
        };

        match &self.spec {
            JobSpec::Scheduled {
                schedule,
                schedule_kind,
                retries,
            } => {
                request.schedule = schedule.clone();
                request.schedule_type = Some(*schedule_kind);
                request.num_retries_on_failure = *retries;
            }
            JobSpec::RunOnce { instances, retries } => {
                request.instances = Some(*instances);
                request.num_retries_on_failure = *retries;
            }
            JobSpec::Service { instances } | JobSpec::Worker { instances } => {
                request.instances = Some(*instances);
            }
            JobSpec::OnDemand { instances, retries } => {
                request.instances = *instances;
                request.num_retries_on_failure = *retries;
            }
        }

        Ok(request)
    }

    /// Map a remote request back onto a job, reading only the fields that
    /// are meaningful for its kind.
    pub fn from_wire(request: &SingularityRequest, state: Option<RequestState>) -> Result<Job, JobError> {
        let kind = JobKind::from(request.request_type);
        let spec = match kind {
            JobKind::Scheduled => {
                let schedule_kind = match request.schedule_type {
                    None | Some(ScheduleType::Cron) => ACCEPTED_SCHEDULE_KIND,
                    Some(other) => {
                        return Err(JobError::UnsupportedRemoteValue(format!(
                            "schedule type {} on job '{}'",
                            other, request.id
                        )))
                    }
                };
                JobSpec::Scheduled {
                    schedule: request.schedule.clone(),
                    schedule_kind,
                    retries: request.num_retries_on_failure,
                }
            }
            JobKind::RunOnce => JobSpec::RunOnce {
                instances: request.instances.unwrap_or(1),
                retries: request.num_retries_on_failure,
            },
            JobKind::Service => JobSpec::Service {
                instances: request.instances.unwrap_or(1),
            },
            JobKind::Worker => JobSpec::Worker {
                instances: request.instances.unwrap_or(1),
            },
            JobKind::OnDemand => JobSpec::OnDemand {
                instances: request.instances,
                retries: request.num_retries_on_failure,
            },
        };

        Ok(Job {
            id: normalize_job_id(&request.id)?,
            slave_placement: request.slave_placement.unwrap_or_default(),
            spec,
            state,
        })
    }

    /// Submit this job. Always `POST /api/requests`; the kind travels in the body.
    pub fn create(&self, client: &SingularityClient) -> Result<ApiResponse, JobError> {
        let request = self.to_wire()?;
        debug!(job_id = %self.id, kind = %self.kind(), "submitting job");
        Ok(client.create_job(&request)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::create_job;
    use serde_json::json;
    use singularity_wire::SlavePlacement;

    #[test]
    fn test_scheduled_to_wire() {
        let job = create_job(JobKind::Scheduled, "foo")
            .unwrap()
            .set_schedule("0 7 * * *")
            .unwrap();
        let value = serde_json::to_value(job.to_wire().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "foo",
                "requestType": "SCHEDULED",
                "schedule": "0 7 * * *",
                "scheduleType": "CRON",
                "slavePlacement": "SEPARATE_BY_DEPLOY"
            })
        );
    }

    #[test]
    fn test_service_to_wire_has_no_schedule_fields() {
        let job = create_job(JobKind::Service, "bar").unwrap().set_instances(3).unwrap();
        let request = job.to_wire().unwrap();
        assert_eq!(request.instances, Some(3));
        assert!(request.schedule.is_none());
        assert!(request.schedule_type.is_none());
        assert!(request.num_retries_on_failure.is_none());
    }

    #[test]
    fn test_to_wire_requires_schedule() {
        let job = create_job(JobKind::Scheduled, "foo").unwrap();
        assert!(matches!(job.to_wire(), Err(JobError::MissingSchedule(_))));
    }

    #[test]
    fn test_from_wire_ignores_fields_outside_kind() {
        let request: SingularityRequest = serde_json::from_value(json!({
            "id": "svc",
            "requestType": "SERVICE",
            "instances": 4,
            "numRetriesOnFailure": 9,
            "schedule": "0 7 * * *"
        }))
        .unwrap();
        let job = Job::from_wire(&request, Some(RequestState::Active)).unwrap();
        assert_eq!(job.spec, JobSpec::Service { instances: 4 });
        assert_eq!(job.state, Some(RequestState::Active));
    }

    #[test]
    fn test_from_wire_scheduled_ignores_instances() {
        let request: SingularityRequest = serde_json::from_value(json!({
            "id": "cron",
            "requestType": "SCHEDULED",
            "instances": 1,
            "schedule": "*/5 * * * *",
            "scheduleType": "CRON",
            "numRetriesOnFailure": 2,
            "slavePlacement": "SEPARATE_BY_REQUEST"
        }))
        .unwrap();
        let job = Job::from_wire(&request, None).unwrap();
        assert_eq!(job.instances(), None);
        assert_eq!(job.schedule(), Some("*/5 * * * *"));
        assert_eq!(job.retries(), Some(2));
        assert_eq!(job.slave_placement, SlavePlacement::SeparateByRequest);
    }

    #[test]
    fn test_from_wire_rejects_quartz() {
        let request: SingularityRequest = serde_json::from_value(json!({
            "id": "q",
            "requestType": "SCHEDULED",
            "schedule": "0 0 7 ? * *",
            "scheduleType": "QUARTZ"
        }))
        .unwrap();
        assert!(matches!(
            Job::from_wire(&request, None),
            Err(JobError::UnsupportedRemoteValue(_))
        ));
    }

    #[test]
    fn test_wire_round_trip_preserves_job() {
        let job = create_job(JobKind::RunOnce, "migrate")
            .unwrap()
            .set_instances(2)
            .unwrap()
            .set_retries(1)
            .unwrap();
        let back = Job::from_wire(&job.to_wire().unwrap(), None).unwrap();
        assert_eq!(back, job);
    }
}
