//! Job Variant Model
//!
//! A job definition is one of five mutually exclusive kinds. Each kind
//! carries only the fields that are meaningful for it, so "exactly one
//! kind-specific field set" holds by construction.
//!
//! Setters consume and return the job so they chain with `?`:
//!
//! ```no_run
//! # use singularity_reconciler::job::{create_job, JobKind};
//! let job = create_job(JobKind::Scheduled, "nightly-report")?
//!     .set_schedule_kind("CRON")?
//!     .set_schedule("0 7 * * *")?
//!     .set_retries(2)?;
//! # Ok::<(), singularity_reconciler::job::JobError>(())
//! ```

mod schedule;
mod wire;

pub use schedule::{parse_schedule_kind, validate_cron, ACCEPTED_SCHEDULE_KIND};

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use singularity_wire::{RequestState, RequestType, ScheduleType, SlavePlacement};

use crate::api::ClientError;

/// Kind of a job definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Scheduled,
    RunOnce,
    Service,
    Worker,
    OnDemand,
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::Scheduled,
        JobKind::RunOnce,
        JobKind::Service,
        JobKind::Worker,
        JobKind::OnDemand,
    ];
}

impl From<JobKind> for RequestType {
    fn from(kind: JobKind) -> Self {
        match kind {
            JobKind::Scheduled => RequestType::Scheduled,
            JobKind::RunOnce => RequestType::RunOnce,
            JobKind::Service => RequestType::Service,
            JobKind::Worker => RequestType::Worker,
            JobKind::OnDemand => RequestType::OnDemand,
        }
    }
}

impl From<RequestType> for JobKind {
    fn from(request_type: RequestType) -> Self {
        match request_type {
            RequestType::Scheduled => JobKind::Scheduled,
            RequestType::RunOnce => JobKind::RunOnce,
            RequestType::Service => JobKind::Service,
            RequestType::Worker => JobKind::Worker,
            RequestType::OnDemand => JobKind::OnDemand,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(RequestType::from(*self).as_str())
    }
}

impl FromStr for JobKind {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestType::from_str(s)
            .map(JobKind::from)
            .map_err(|_| JobError::InvalidKind(s.to_string()))
    }
}

/// Kind-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSpec {
    Scheduled {
        /// Required before submission.
        schedule: Option<String>,
        schedule_kind: ScheduleType,
        retries: Option<u32>,
    },
    RunOnce {
        instances: u32,
        retries: Option<u32>,
    },
    Service {
        instances: u32,
    },
    Worker {
        instances: u32,
    },
    OnDemand {
        instances: Option<u32>,
        retries: Option<u32>,
    },
}

impl JobSpec {
    /// Correctly defaulted fields for `kind`.
    pub fn defaults(kind: JobKind) -> Self {
        match kind {
            JobKind::Scheduled => JobSpec::Scheduled {
                schedule: None,
                schedule_kind: ACCEPTED_SCHEDULE_KIND,
                retries: None,
            },
            JobKind::RunOnce => JobSpec::RunOnce {
                instances: 1,
                retries: None,
            },
            JobKind::Service => JobSpec::Service { instances: 1 },
            JobKind::Worker => JobSpec::Worker { instances: 1 },
            JobKind::OnDemand => JobSpec::OnDemand {
                instances: None,
                retries: None,
            },
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobSpec::Scheduled { .. } => JobKind::Scheduled,
            JobSpec::RunOnce { .. } => JobKind::RunOnce,
            JobSpec::Service { .. } => JobKind::Service,
            JobSpec::Worker { .. } => JobKind::Worker,
            JobSpec::OnDemand { .. } => JobKind::OnDemand,
        }
    }
}

/// A job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Lowercase id, immutable after creation.
    pub id: String,
    pub slave_placement: SlavePlacement,
    #[serde(flatten)]
    pub spec: JobSpec,
    /// Remote state as of the last read. Never submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RequestState>,
}

/// Create a correctly defaulted job of the given kind.
pub fn create_job(kind: JobKind, id: &str) -> Result<Job, JobError> {
    Ok(Job {
        id: normalize_job_id(id)?,
        slave_placement: SlavePlacement::default(),
        spec: JobSpec::defaults(kind),
        state: None,
    })
}

/// Lowercase `id` and check it against the scheduler's id grammar.
pub fn normalize_job_id(id: &str) -> Result<String, JobError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").unwrap());

    let normalized = id.trim().to_ascii_lowercase();
    if !pattern.is_match(&normalized) {
        return Err(JobError::InvalidJobId(id.to_string()));
    }
    Ok(normalized)
}

impl Job {
    pub fn kind(&self) -> JobKind {
        self.spec.kind()
    }

    /// Instance count, for kinds where it is meaningful.
    pub fn instances(&self) -> Option<u32> {
        match &self.spec {
            JobSpec::RunOnce { instances, .. }
            | JobSpec::Service { instances }
            | JobSpec::Worker { instances } => Some(*instances),
            JobSpec::OnDemand { instances, .. } => *instances,
            JobSpec::Scheduled { .. } => None,
        }
    }

    pub fn schedule(&self) -> Option<&str> {
        match &self.spec {
            JobSpec::Scheduled { schedule, .. } => schedule.as_deref(),
            _ => None,
        }
    }

    pub fn schedule_kind(&self) -> Option<ScheduleType> {
        match &self.spec {
            JobSpec::Scheduled { schedule_kind, .. } => Some(*schedule_kind),
            _ => None,
        }
    }

    pub fn retries(&self) -> Option<u32> {
        match &self.spec {
            JobSpec::Scheduled { retries, .. }
            | JobSpec::RunOnce { retries, .. }
            | JobSpec::OnDemand { retries, .. } => *retries,
            JobSpec::Service { .. } | JobSpec::Worker { .. } => None,
        }
    }

    fn not_applicable(&self, field: &'static str) -> JobError {
        JobError::FieldNotApplicable {
            field,
            kind: self.kind(),
        }
    }

    /// Set the schedule grammar. Only `CRON` is accepted.
    pub fn set_schedule_kind(mut self, value: &str) -> Result<Self, JobError> {
        let parsed = parse_schedule_kind(value)?;
        match &mut self.spec {
            JobSpec::Scheduled { schedule_kind, .. } => *schedule_kind = parsed,
            _ => return Err(self.not_applicable("schedule_kind")),
        }
        Ok(self)
    }

    /// Set the cron line (5 or 6 fields).
    pub fn set_schedule(mut self, expr: &str) -> Result<Self, JobError> {
        let validated = validate_cron(expr)?;
        match &mut self.spec {
            JobSpec::Scheduled { schedule, .. } => *schedule = Some(validated),
            _ => return Err(self.not_applicable("schedule")),
        }
        Ok(self)
    }

    /// Set the instance count.
    ///
    /// Scheduled jobs run a single instance per trigger; 0 or 1 is accepted
    /// for them and nothing is stored.
    pub fn set_instances(mut self, count: u32) -> Result<Self, JobError> {
        match &mut self.spec {
            JobSpec::Scheduled { .. } => {
                if count > 1 {
                    return Err(JobError::InvalidInstances {
                        kind: JobKind::Scheduled,
                        instances: count,
                    });
                }
            }
            JobSpec::RunOnce { instances, .. }
            | JobSpec::Service { instances }
            | JobSpec::Worker { instances } => *instances = count,
            JobSpec::OnDemand { instances, .. } => *instances = Some(count),
        }
        Ok(self)
    }

    /// Set retries after a failed run (SCHEDULED, RUN_ONCE, ON_DEMAND).
    pub fn set_retries(mut self, count: u32) -> Result<Self, JobError> {
        match &mut self.spec {
            JobSpec::Scheduled { retries, .. }
            | JobSpec::RunOnce { retries, .. }
            | JobSpec::OnDemand { retries, .. } => *retries = Some(count),
            JobSpec::Service { .. } | JobSpec::Worker { .. } => {
                return Err(self.not_applicable("num_retries_on_failure"))
            }
        }
        Ok(self)
    }

    pub fn set_slave_placement(mut self, placement: SlavePlacement) -> Self {
        self.slave_placement = placement;
        self
    }

    /// Check submission-time invariants.
    pub fn validate(&self) -> Result<(), JobError> {
        normalize_job_id(&self.id)?;
        if let JobSpec::Scheduled { schedule, .. } = &self.spec {
            match schedule {
                Some(expr) => {
                    validate_cron(expr)?;
                }
                None => return Err(JobError::MissingSchedule(self.id.clone())),
            }
        }
        Ok(())
    }
}

/// Job model errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid job id '{0}' (allowed: lowercase letters, digits, '_' and '-')")]
    InvalidJobId(String),

    #[error("invalid job kind '{0}'")]
    InvalidKind(String),

    #[error("invalid schedule kind '{0}' (only CRON is supported)")]
    InvalidScheduleKind(String),

    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCronExpression { expr: String, reason: String },

    #[error("{kind} jobs cannot run {instances} instances")]
    InvalidInstances { kind: JobKind, instances: u32 },

    #[error("field {field} does not apply to {kind} jobs")]
    FieldNotApplicable { field: &'static str, kind: JobKind },

    #[error("scheduled job '{0}' has no schedule")]
    MissingSchedule(String),

    #[error("unsupported value from scheduler: {0}")]
    UnsupportedRemoteValue(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}
