//! Scheduler API Client
//!
//! HTTP plumbing between the reconciler and the remote scheduler:
//! - `transport`: raw request/response exchange (real and mock)
//! - `client`: typed operations with the bounded retry policy

pub mod client;
pub mod transport;

pub use client::{ApiResponse, ClientError, ClientResult, RetryPolicy, SingularityClient};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, MockTransport, Transport, TransportError};
