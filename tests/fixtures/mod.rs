//! Shared harness for reconciler integration tests
//!
//! Every test talks to an in-process `MockScheduler` through `MockTransport`
//! with all delays shrunk to zero.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use singularity_reconciler::api::{MockTransport, RetryPolicy, SingularityClient};
use singularity_reconciler::config::ReconcileSettings;
use singularity_reconciler::deploy::{new_deployment, ContainerSpec, Deployment, Resources};
use singularity_reconciler::mock::MockScheduler;
use singularity_reconciler::poll::PollConfig;
use singularity_reconciler::reconcile::{DeploymentReconciler, JobReconciler};

/// Mock scheduler, a client bound to it, and both reconcilers
pub struct Harness {
    pub scheduler: MockScheduler,
    pub client: SingularityClient,
    pub jobs: JobReconciler,
    pub deploys: DeploymentReconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_poll_attempts(10)
    }

    pub fn with_poll_attempts(max_attempts: u32) -> Self {
        let scheduler = MockScheduler::new();
        let client = client_for(&scheduler, RetryPolicy::default());
        let mut settings = ReconcileSettings::immediate();
        settings.convergence = PollConfig::default()
            .with_interval(Duration::ZERO)
            .with_max_attempts(max_attempts);
        Self {
            jobs: JobReconciler::new(settings.clone()),
            deploys: DeploymentReconciler::new(settings),
            scheduler,
            client,
        }
    }
}

/// Client over `scheduler` with the given policy and no retry delay.
pub fn client_for(scheduler: &MockScheduler, retry: RetryPolicy) -> SingularityClient {
    let transport = MockTransport::with_scheduler(scheduler.clone());
    SingularityClient::with_retry(Arc::new(transport), retry.with_delay(Duration::ZERO))
}

/// Docker deployment for `job_id` with no ports.
pub fn docker_deployment(job_id: &str, image: &str) -> Deployment {
    new_deployment("")
        .set_job_id(job_id)
        .set_command("/app/run")
        .set_container_spec(ContainerSpec::docker(image))
        .unwrap()
        .set_resources(Resources {
            cpus: 0.25,
            memory_mb: 128.0,
            num_ports: 0,
        })
        .build()
        .unwrap()
}
