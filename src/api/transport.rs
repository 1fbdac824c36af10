//! Transport Layer for the Scheduler API
//!
//! Abstracts the HTTP connection for testability. Provides:
//! - Transport trait: one request in, one status + body out
//! - MockTransport: in-process fake scheduler for tests
//! - HttpTransport: blocking HTTP client for production

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::mock::MockScheduler;

/// HTTP method used by the scheduler API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the endpoint, starting with `/`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw status and body as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport trait for scheduler communication
pub trait Transport: Send + Sync {
    /// Send a request and return whatever status the peer answered with.
    ///
    /// Only failures to obtain a response at all are errors.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Mock transport for testing - routes requests to a MockScheduler in-process
pub struct MockTransport {
    scheduler: MockScheduler,
}

impl MockTransport {
    /// Create a new mock transport with an empty scheduler
    pub fn new() -> Self {
        Self {
            scheduler: MockScheduler::new(),
        }
    }

    /// Create a mock transport with a pre-configured scheduler
    pub fn with_scheduler(scheduler: MockScheduler) -> Self {
        Self { scheduler }
    }

    /// Get a reference to the underlying scheduler for test configuration
    pub fn scheduler(&self) -> &MockScheduler {
        &self.scheduler
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.scheduler.handle(request)
    }
}

/// HTTP transport for production use
///
/// Sends JSON bodies over a blocking client bound to one endpoint.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport for `base_url` (scheme and authority, no trailing slash).
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, TransportError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TransportError::InvalidEndpoint(base_url));
        }
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Endpoint this transport talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, self.url(&request.path))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                TransportError::ConnectionTimeout
            } else if e.is_connect() {
                TransportError::ConnectionFailed(e.to_string())
            } else {
                TransportError::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
