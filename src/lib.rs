//! Singularity Reconciler - declarative job and deploy management
//!
//! This crate drives a Singularity scheduler toward a desired set of jobs
//! and deployments: it validates definitions locally, talks to the
//! scheduler's HTTP API with retry, and waits for deploys to converge.

pub mod api;
pub mod config;
pub mod deploy;
pub mod job;
pub mod manifest;
pub mod mock;
pub mod poll;
pub mod reconcile;
pub mod state;

pub use api::{MockTransport, SingularityClient, Transport};
pub use deploy::{new_deployment, Deployment, DeploymentBuilder};
pub use job::{create_job, Job, JobKind};
pub use manifest::Manifest;
pub use reconcile::{DeploymentReconciler, FailureKind, JobReconciler, ReconcileError};
