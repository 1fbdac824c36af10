//! Request (job definition) payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{parse_variant, WireError};

/// Scheduling policy of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    /// Runs on a cron schedule.
    Scheduled,
    /// Runs once to completion.
    RunOnce,
    /// Long-running, load-balanced instances.
    Service,
    /// Long-running instances without load balancing.
    Worker,
    /// Runs only when triggered.
    OnDemand,
}

impl RequestType {
    const VARIANTS: [(Self, &'static str); 5] = [
        (Self::Scheduled, "SCHEDULED"),
        (Self::RunOnce, "RUN_ONCE"),
        (Self::Service, "SERVICE"),
        (Self::Worker, "WORKER"),
        (Self::OnDemand, "ON_DEMAND"),
    ];

    /// Wire name of this request type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::RunOnce => "RUN_ONCE",
            Self::Service => "SERVICE",
            Self::Worker => "WORKER",
            Self::OnDemand => "ON_DEMAND",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("request type", s, &Self::VARIANTS)
    }
}

/// Grammar of a request's schedule string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    /// Unix cron (5 or 6 fields).
    Cron,
    /// Quartz cron. Reported by the scheduler, never submitted by this client.
    Quartz,
}

impl ScheduleType {
    const VARIANTS: [(Self, &'static str); 2] = [(Self::Cron, "CRON"), (Self::Quartz, "QUARTZ")];

    /// Wire name of this schedule type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cron => "CRON",
            Self::Quartz => "QUARTZ",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleType {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("schedule type", s, &Self::VARIANTS)
    }
}

/// Anti-affinity policy for spreading task instances across agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlavePlacement {
    /// At most one instance of a given deploy per agent.
    #[default]
    SeparateByDeploy,
    /// At most one instance of the request per agent.
    SeparateByRequest,
    /// One instance on every agent.
    SeparateAllSlaves,
}

impl SlavePlacement {
    const VARIANTS: [(Self, &'static str); 3] = [
        (Self::SeparateByDeploy, "SEPARATE_BY_DEPLOY"),
        (Self::SeparateByRequest, "SEPARATE_BY_REQUEST"),
        (Self::SeparateAllSlaves, "SEPARATE_ALL_SLAVES"),
    ];

    /// Wire name of this placement.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeparateByDeploy => "SEPARATE_BY_DEPLOY",
            Self::SeparateByRequest => "SEPARATE_BY_REQUEST",
            Self::SeparateAllSlaves => "SEPARATE_ALL_SLAVES",
        }
    }
}

impl fmt::Display for SlavePlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlavePlacement {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("slave placement", s, &Self::VARIANTS)
    }
}

/// Remote lifecycle state of a request. Read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Active,
    Deleting,
    Deleted,
    Paused,
    SystemCooldown,
    Finished,
    DeployingToUnpause,
    /// Any state this client does not know about.
    #[serde(other)]
    Unknown,
}

impl RequestState {
    /// Wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
            Self::Paused => "PAUSED",
            Self::SystemCooldown => "SYSTEM_COOLDOWN",
            Self::Finished => "FINISHED",
            Self::DeployingToUnpause => "DEPLOYING_TO_UNPAUSE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload (`POST /api/requests`, and the `request` member of reads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingularityRequest {
    /// Request id.
    pub id: String,
    /// Scheduling policy.
    pub request_type: RequestType,
    /// Number of task instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    /// Retries after a failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_retries_on_failure: Option<u32>,
    /// Schedule expression (scheduled requests only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Grammar of `schedule`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<ScheduleType>,
    /// Anti-affinity policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_placement: Option<SlavePlacement>,
}

impl SingularityRequest {
    /// Bare request with every optional field unset.
    pub fn new(id: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            id: id.into(),
            request_type,
            instances: None,
            num_retries_on_failure: None,
            schedule: None,
            schedule_type: None,
            slave_placement: None,
        }
    }
}
