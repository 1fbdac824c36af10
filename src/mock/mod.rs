//! Mock Scheduler Implementation
//!
//! In-process fake of the scheduler HTTP API for tests, wired in through
//! `MockTransport`. Supports:
//!
//! - every route the reconciler calls (list, read, create, delete, scale,
//!   deploy, cancel pending deploy)
//! - configurable pending → active deploy progression
//! - forced remote states (`PAUSED`, `SYSTEM_COOLDOWN`, ...)
//! - a delete lag that refuses recreation with 409 for a few attempts
//! - per-route failure injection and a request log

mod failure;
mod scheduler;
mod state;

pub use failure::{FailureConfig, FailureInjector};
pub use scheduler::{LoggedRequest, MockScheduler};
pub use state::{DeployActivation, MockJob, MockState};

use crate::api::Method;

/// Routes understood by the mock scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ListJobs,
    GetJob,
    CreateJob,
    DeleteJob,
    ScaleJob,
    CreateDeploy,
    CancelDeploy,
}

/// A request matched to a route, with its path parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: Route,
    pub job_id: Option<String>,
    pub deploy_id: Option<String>,
}

impl Route {
    /// Match a method and path against the scheduler API
    pub fn resolve(method: Method, path: &str) -> Option<RouteMatch> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let matched = |route, job_id: Option<&str>, deploy_id: Option<&str>| RouteMatch {
            route,
            job_id: job_id.map(str::to_string),
            deploy_id: deploy_id.map(str::to_string),
        };

        match (method, segments.as_slice()) {
            (Method::Get, ["api", "requests"]) => Some(matched(Route::ListJobs, None, None)),
            (Method::Post, ["api", "requests"]) => Some(matched(Route::CreateJob, None, None)),
            (Method::Get, ["api", "requests", "request", id]) => Some(matched(Route::GetJob, Some(*id), None)),
            (Method::Delete, ["api", "requests", "request", id]) => {
                Some(matched(Route::DeleteJob, Some(*id), None))
            }
            (Method::Put, ["api", "requests", "request", id, "scale"]) => {
                Some(matched(Route::ScaleJob, Some(*id), None))
            }
            (Method::Post, ["api", "deploys"]) => Some(matched(Route::CreateDeploy, None, None)),
            (Method::Delete, ["api", "deploys", "deploy", deploy, "request", id]) => {
                Some(matched(Route::CancelDeploy, Some(*id), Some(*deploy)))
            }
            _ => None,
        }
    }
}
