//! Scheduler API Client
//!
//! Typed operations over a `Transport`, with a bounded retry policy for the
//! statuses the scheduler emits while concurrent mutations race.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use singularity_wire::{routes, DeleteRequest, DeployRequest, RequestParent, ScaleRequest, SingularityRequest};

use super::transport::{HttpRequest, Method, Transport, TransportError};

/// Default number of attempts per request.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Bounded retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
    /// Statuses that are retried instead of returned.
    pub transient: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            // 400 is also how the scheduler reports a mutation race
            transient: [400, 409, 500].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_transient(&self, status: u16) -> bool {
        self.transient.contains(&status)
    }
}

/// Raw outcome of a request after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Status within the inclusive range 200..=299.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Decode the body as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::Decode {
            status: self.status,
            message: e.to_string(),
        })
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Transport error after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to decode response (status {status}): {message}")]
    Decode { status: u16, message: String },
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Scheduler API client
pub struct SingularityClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl SingularityClient {
    /// Create a client with the default retry policy
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_retry(transport, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy
    pub fn with_retry(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Issue a request, retrying transient statuses and transport failures.
    ///
    /// Non-transient statuses are returned as-is; callers decide what a
    /// given status means at their call site. When attempts run out on a
    /// transient status, the last response is returned.
    pub fn request(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<ApiResponse> {
        let mut request = HttpRequest::new(method, path);
        request.body = body;
        let max_attempts = self.retry.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(%method, path, attempt, "sending request");

            match self.transport.send(&request) {
                Ok(response) => {
                    if self.retry.is_transient(response.status) && attempt < max_attempts {
                        warn!(%method, path, status = response.status, attempt, "transient status, retrying");
                        std::thread::sleep(self.retry.delay);
                        continue;
                    }
                    debug!(%method, path, status = response.status, attempt, "response received");
                    return Ok(ApiResponse {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(e) => {
                    if attempt < max_attempts {
                        warn!(%method, path, error = %e, attempt, "transport failure, retrying");
                        std::thread::sleep(self.retry.delay);
                        continue;
                    }
                    return Err(ClientError::Transport { attempts: attempt, source: e });
                }
            }
        }
    }

    fn request_json<B: Serialize>(&self, method: Method, path: &str, body: &B) -> ClientResult<ApiResponse> {
        let body = serde_json::to_value(body)?;
        self.request(method, path, Some(body))
    }

    // === Typed Operations ===

    /// `GET /api/requests`; the decoded list is present only on success.
    pub fn list_jobs(&self) -> ClientResult<(ApiResponse, Option<Vec<RequestParent>>)> {
        let response = self.request(Method::Get, routes::REQUESTS, None)?;
        let parents = if response.is_success() { Some(response.decode()?) } else { None };
        Ok((response, parents))
    }

    /// `GET /api/requests/request/{id}`; the decoded job is present only on success.
    pub fn get_job(&self, job_id: &str) -> ClientResult<(ApiResponse, Option<RequestParent>)> {
        let response = self.request(Method::Get, &routes::request(job_id), None)?;
        let parent = if response.is_success() { Some(response.decode()?) } else { None };
        Ok((response, parent))
    }

    /// `POST /api/requests`
    pub fn create_job(&self, request: &SingularityRequest) -> ClientResult<ApiResponse> {
        self.request_json(Method::Post, routes::REQUESTS, request)
    }

    /// `DELETE /api/requests/request/{id}` with the fixed audit body.
    pub fn delete_job(&self, job_id: &str) -> ClientResult<ApiResponse> {
        self.request_json(Method::Delete, &routes::request(job_id), &DeleteRequest::audited())
    }

    /// `PUT /api/requests/request/{id}/scale`
    pub fn scale_job(&self, job_id: &str, instances: u32) -> ClientResult<ApiResponse> {
        self.request_json(Method::Put, &routes::scale(job_id), &ScaleRequest::to(instances))
    }

    /// `POST /api/deploys`
    pub fn create_deploy(&self, request: &DeployRequest) -> ClientResult<ApiResponse> {
        self.request_json(Method::Post, routes::DEPLOYS, request)
    }

    /// `DELETE /api/deploys/deploy/{deployId}/request/{jobId}`
    pub fn cancel_pending_deploy(&self, deploy_id: &str, job_id: &str) -> ClientResult<ApiResponse> {
        self.request(Method::Delete, &routes::pending_deploy(deploy_id, job_id), None)
    }
}
