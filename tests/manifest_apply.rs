//! Manifest and configuration tests
//!
//! Load a manifest and a layered config from disk, then reconcile the
//! manifest against the mock scheduler.

mod fixtures;

use std::fs;

use fixtures::Harness;
use serde_json::json;
use singularity_reconciler::config::EffectiveConfig;
use singularity_reconciler::mock::Route;
use singularity_reconciler::reconcile::DeployState;
use singularity_reconciler::Manifest;
use singularity_wire::RequestState;
use tempfile::TempDir;

const MANIFEST: &str = r#"
[job]
id = "checkout"
type = "SERVICE"
instances = 2

[deployment]
command = "/srv/checkout"

[deployment.container]
image = "registry.local/checkout:7"

[[deployment.container.port_mappings]]
container_port = 8080
host_port = 0
host_port_type = "FROM_OFFER"

[deployment.resources]
cpus = 1.0
memory_mb = 512
num_ports = 1
"#;

// =============================================================================
// Apply
// =============================================================================

#[test]
fn test_apply_manifest_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkout.toml");
    fs::write(&path, MANIFEST).unwrap();

    let manifest = Manifest::load(&path).unwrap();
    let job = manifest.job.unwrap();
    let deployment = manifest.deployment.unwrap();
    assert_eq!(deployment.job_id, "checkout");

    let h = Harness::new();
    let applied = h.jobs.apply(&h.client, &job).unwrap();
    assert_eq!(applied.job.instances(), Some(2));

    let deployed = h.deploys.apply(&h.client, &deployment).unwrap();
    assert_eq!(deployed.deploy_state, DeployState::Active);
    assert_eq!(deployed.deployment.resources.num_ports, 1);

    // Applying the same manifest again changes nothing.
    let again_job = h.jobs.apply(&h.client, &job).unwrap();
    assert_eq!(again_job.job, applied.job);
    let again = h.deploys.apply(&h.client, &deployment).unwrap();
    assert_eq!(again.id(), deployed.id());
    assert_eq!(h.scheduler.route_count(Route::CreateJob), 1);
    assert_eq!(h.scheduler.route_count(Route::CreateDeploy), 1);
}

#[test]
fn test_apply_manifest_over_cooldown_job() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkout.toml");
    fs::write(&path, MANIFEST).unwrap();
    let job = Manifest::load(&path).unwrap().job.unwrap();

    let h = Harness::new();
    h.jobs.apply(&h.client, &job).unwrap();
    h.scheduler.set_job_state("checkout", RequestState::SystemCooldown);

    let applied = h.jobs.apply(&h.client, &job).unwrap();
    assert_eq!(applied.job.state, Some(RequestState::Active));
    assert_eq!(h.scheduler.route_count(Route::DeleteJob), 1);
}

// =============================================================================
// Config layering
// =============================================================================

#[test]
fn test_config_layers_project_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("singularity.toml");
    fs::write(
        &path,
        "host = \"file.example\"\nport = 8080\nsettle_seconds = 5\n\n[poll]\nmax_attempts = 12\n",
    )
    .unwrap();

    let config = EffectiveConfig::build(
        Some(&path),
        Some(json!({ "retry": 4 })),
        Some(json!({ "host": "cli.example" })),
    )
    .unwrap();
    assert_eq!(config.sources.len(), 4);

    let client = config.client_settings().unwrap();
    assert_eq!(client.base_url, "http://cli.example:8080");
    assert_eq!(client.retry.max_attempts, 4);

    let reconcile = config.reconcile_settings();
    assert_eq!(reconcile.settle.as_secs(), 5);
    assert_eq!(reconcile.convergence.max_attempts, 12);
}

#[test]
fn test_config_rejects_retry_out_of_range() {
    let err = EffectiveConfig::build(None, None, Some(json!({ "host": "h", "retry": 11 }))).unwrap_err();
    assert!(err.to_string().contains("retry"));
}
