//! Mock Scheduler Implementation
//!
//! Answers scheduler API requests from in-memory state.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use singularity_wire::{DeployRequest, RequestParent, RequestState, ScaleRequest, SingularityRequest};

use crate::api::{HttpRequest, HttpResponse, TransportError};

use super::failure::{FailureConfig, FailureInjector};
use super::state::{DeployActivation, MockJob, MockState};
use super::{Route, RouteMatch};

/// A request as seen by the mock scheduler
#[derive(Debug, Clone)]
pub struct LoggedRequest {
    pub route: Option<Route>,
    pub request: HttpRequest,
}

/// Configurable mock scheduler for testing
#[derive(Clone, Default)]
pub struct MockScheduler {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
    activation: Arc<Mutex<DeployActivation>>,
    delete_lag: Arc<Mutex<u32>>,
    log: Arc<Mutex<Vec<LoggedRequest>>>,
}

fn json_response<T: Serialize>(status: u16, value: &T) -> HttpResponse {
    match serde_json::to_string(value) {
        Ok(body) => HttpResponse::new(status, body),
        Err(e) => HttpResponse::new(500, e.to_string()),
    }
}

fn parse_body<T: DeserializeOwned>(request: &HttpRequest) -> Result<T, HttpResponse> {
    let body = request
        .body
        .clone()
        .ok_or_else(|| HttpResponse::new(400, "missing request body"))?;
    serde_json::from_value(body).map_err(|e| HttpResponse::new(400, format!("invalid body: {}", e)))
}

impl MockScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    // === Public API for test configuration ===

    /// Add a job directly, bypassing the API
    pub fn seed_job(&self, request: SingularityRequest) {
        let mut state = self.state.lock().unwrap();
        state.jobs.insert(request.id.clone(), MockJob::new(request));
    }

    /// Force the remote state of a job
    pub fn set_job_state(&self, job_id: &str, new_state: RequestState) {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.state = new_state;
        }
    }

    /// Control when submitted deploys become active
    pub fn set_deploy_activation(&self, activation: DeployActivation) {
        *self.activation.lock().unwrap() = activation;
    }

    /// Refuse the next `attempts` creates of a deleted id with 409
    pub fn set_delete_lag(&self, attempts: u32) {
        *self.delete_lag.lock().unwrap() = attempts;
    }

    /// Inject a failure configuration for a route
    pub fn inject_failure(&self, route: Route, config: FailureConfig) {
        self.failures.lock().unwrap().inject(route, config);
    }

    /// Answer every call to `route` with `status`
    pub fn inject_status(&self, route: Route, status: u16, body: &str) {
        self.inject_failure(route, FailureConfig::status(status, body));
    }

    /// Clear all failure injections
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Current view of a job, without counting as a read
    pub fn job(&self, job_id: &str) -> Option<RequestParent> {
        self.state.lock().unwrap().jobs.get(job_id).map(MockJob::to_parent)
    }

    pub fn job_count(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    /// Every request received so far
    pub fn request_log(&self) -> Vec<LoggedRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Number of requests received for `route`
    pub fn route_count(&self, route: Route) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route == Some(route))
            .count()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    // === Request handling ===

    /// Handle one request
    pub fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let matched = Route::resolve(request.method, &request.path);
        self.log.lock().unwrap().push(LoggedRequest {
            route: matched.as_ref().map(|m| m.route),
            request: request.clone(),
        });

        let Some(matched) = matched else {
            return Ok(HttpResponse::new(404, format!("no route for {} {}", request.method, request.path)));
        };

        let failure = self.failures.lock().unwrap().check(matched.route);
        if let Some(failure) = failure {
            if let Some(delay) = failure.delay {
                std::thread::sleep(delay);
            }
            if failure.disconnect {
                return Err(TransportError::ConnectionFailed("connection reset by mock".to_string()));
            }
            if let Some(status) = failure.status {
                return Ok(HttpResponse::new(status, failure.body.unwrap_or_default()));
            }
        }

        let response = match matched.route {
            Route::ListJobs => self.handle_list(),
            Route::GetJob => self.handle_get(&matched),
            Route::CreateJob => self.handle_create_job(request),
            Route::DeleteJob => self.handle_delete_job(&matched),
            Route::ScaleJob => self.handle_scale(&matched, request),
            Route::CreateDeploy => self.handle_create_deploy(request),
            Route::CancelDeploy => self.handle_cancel(&matched),
        };
        Ok(response.unwrap_or_else(|error| error))
    }

    fn handle_list(&self) -> Result<HttpResponse, HttpResponse> {
        let state = self.state.lock().unwrap();
        let parents: Vec<RequestParent> = state.jobs.values().map(MockJob::to_parent).collect();
        Ok(json_response(200, &parents))
    }

    fn handle_get(&self, matched: &RouteMatch) -> Result<HttpResponse, HttpResponse> {
        let job_id = matched.job_id.as_deref().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| HttpResponse::new(404, format!("Couldn't find request with id {}", job_id)))?;
        job.observe_read();
        Ok(json_response(200, &job.to_parent()))
    }

    fn handle_create_job(&self, request: &HttpRequest) -> Result<HttpResponse, HttpResponse> {
        let body: SingularityRequest = parse_body(request)?;
        let mut state = self.state.lock().unwrap();

        if state.hit_tombstone(&body.id) {
            return Err(HttpResponse::new(
                409,
                format!("Request {} is currently being deleted", body.id),
            ));
        }

        // Creating an existing id updates it in place, keeping its deploys
        let job = state
            .jobs
            .entry(body.id.clone())
            .and_modify(|job| job.request = body.clone())
            .or_insert_with(|| MockJob::new(body.clone()));
        Ok(json_response(200, &job.to_parent()))
    }

    fn handle_delete_job(&self, matched: &RouteMatch) -> Result<HttpResponse, HttpResponse> {
        let job_id = matched.job_id.as_deref().unwrap_or_default();
        let lag = *self.delete_lag.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .remove(job_id)
            .ok_or_else(|| HttpResponse::new(404, format!("Couldn't find request with id {}", job_id)))?;
        if lag > 0 {
            state.tombstones.insert(job_id.to_string(), lag);
        }
        let mut parent = job.to_parent();
        parent.state = RequestState::Deleting;
        Ok(json_response(200, &parent))
    }

    fn handle_scale(&self, matched: &RouteMatch, request: &HttpRequest) -> Result<HttpResponse, HttpResponse> {
        let job_id = matched.job_id.as_deref().unwrap_or_default();
        let body: ScaleRequest = parse_body(request)?;
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| HttpResponse::new(404, format!("Couldn't find request with id {}", job_id)))?;
        job.request.instances = Some(body.instances);
        Ok(json_response(200, &job.to_parent()))
    }

    fn handle_create_deploy(&self, request: &HttpRequest) -> Result<HttpResponse, HttpResponse> {
        let body: DeployRequest = parse_body(request)?;
        let activation = *self.activation.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        let job = state.jobs.get_mut(&body.deploy.request_id).ok_or_else(|| {
            HttpResponse::new(400, format!("No request with id {}", body.deploy.request_id))
        })?;

        if job.pending.is_some() {
            return Err(HttpResponse::new(
                409,
                format!("Pending deploy already in progress for {}", job.request.id),
            ));
        }
        if job.active.as_ref().map(|(d, _)| d.id.as_str()) == Some(body.deploy.id.as_str()) {
            return Err(HttpResponse::new(
                400,
                format!("Deploy {} has already been deployed", body.deploy.id),
            ));
        }

        if let Some(updated) = body.updated_request {
            job.request = updated;
        }
        job.submit(body.deploy, activation);
        Ok(json_response(200, &job.to_parent()))
    }

    fn handle_cancel(&self, matched: &RouteMatch) -> Result<HttpResponse, HttpResponse> {
        let job_id = matched.job_id.as_deref().unwrap_or_default();
        let deploy_id = matched.deploy_id.as_deref().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| HttpResponse::new(404, format!("Couldn't find request with id {}", job_id)))?;

        match &job.pending {
            Some((deploy, _)) if deploy.id == deploy_id => {
                job.pending = None;
                job.pending_reads_left = None;
                Ok(json_response(200, &job.to_parent()))
            }
            _ => Err(HttpResponse::new(
                404,
                format!("No pending deploy {} for {}", deploy_id, job_id),
            )),
        }
    }
}
