//! Job lifecycle tests
//!
//! Create, read, scale, recreate and delete jobs against the mock scheduler.

mod fixtures;

use fixtures::Harness;
use singularity_reconciler::job::{create_job, JobKind};
use singularity_reconciler::mock::Route;
use singularity_reconciler::reconcile::{JobRecord, ReconcileError};
use singularity_wire::{RequestState, RequestType, ScheduleType, SlavePlacement};

// =============================================================================
// Create and read
// =============================================================================

#[test]
fn test_scheduled_job_create_and_read() {
    let h = Harness::new();
    let job = create_job(JobKind::Scheduled, "foo")
        .unwrap()
        .set_schedule("0 7 * * *")
        .unwrap()
        .set_retries(2)
        .unwrap();

    let record = h.jobs.create(&h.client, &job).unwrap();
    assert_eq!(record.job.kind(), JobKind::Scheduled);
    assert_eq!(record.job.schedule(), Some("0 7 * * *"));
    assert_eq!(record.job.schedule_kind(), Some(ScheduleType::Cron));
    assert_eq!(record.job.retries(), Some(2));
    assert_eq!(record.job.instances(), None);

    let remote = h.scheduler.job("foo").unwrap();
    assert_eq!(remote.request.request_type, RequestType::Scheduled);
    assert_eq!(remote.request.instances, None);
    assert_eq!(remote.request.slave_placement, Some(SlavePlacement::SeparateByDeploy));
}

#[test]
fn test_weekday_schedules_use_unix_numbering() {
    let h = Harness::new();
    for (id, schedule) in [
        ("sunday", "0 7 * * 0"),
        ("weekly", "0 7 * * 0-6"),
        ("weekdays", "0 9 * * 1-5"),
    ] {
        let job = create_job(JobKind::Scheduled, id)
            .unwrap()
            .set_schedule(schedule)
            .unwrap();
        let record = h.jobs.create(&h.client, &job).unwrap();
        assert_eq!(record.job.schedule(), Some(schedule));
        assert_eq!(h.scheduler.job(id).unwrap().request.schedule.as_deref(), Some(schedule));
    }
}

#[test]
fn test_mixed_case_id_is_normalized() {
    let h = Harness::new();
    let job = create_job(JobKind::Worker, "Queue-Drain").unwrap().set_instances(2).unwrap();
    h.jobs.create(&h.client, &job).unwrap();

    let record = h.jobs.read(&h.client, "QUEUE-DRAIN").unwrap();
    assert_eq!(record.id(), "queue-drain");
    assert_eq!(record.job.instances(), Some(2));
}

#[test]
fn test_create_rejected_locally_sends_nothing() {
    let h = Harness::new();
    let job = create_job(JobKind::Scheduled, "nosched").unwrap();

    let err = h.jobs.create(&h.client, &job).unwrap_err();
    assert_eq!(err.exit_code(), 10);
    assert!(h.scheduler.request_log().is_empty());
}

// =============================================================================
// Update paths
// =============================================================================

#[test]
fn test_service_scale_takes_scale_path() {
    let h = Harness::new();
    let current = h
        .jobs
        .create(&h.client, &create_job(JobKind::Service, "bar").unwrap().set_instances(3).unwrap())
        .unwrap();

    let desired = create_job(JobKind::Service, "bar").unwrap().set_instances(5).unwrap();
    let updated = h.jobs.update(&h.client, &current, &desired).unwrap();

    assert_eq!(updated.job.instances(), Some(5));
    assert_eq!(h.scheduler.route_count(Route::ScaleJob), 1);
    assert_eq!(h.scheduler.route_count(Route::DeleteJob), 0);
    assert_eq!(h.scheduler.route_count(Route::CreateJob), 1);
}

#[test]
fn test_schedule_change_recreates_through_delete_lag() {
    let h = Harness::new();
    let job = |expr: &str| {
        create_job(JobKind::Scheduled, "nightly")
            .unwrap()
            .set_schedule(expr)
            .unwrap()
    };
    let current = h.jobs.create(&h.client, &job("0 2 * * *")).unwrap();

    // Two creates are refused with 409 while the delete propagates; the third lands.
    h.scheduler.set_delete_lag(2);
    let updated = h.jobs.update(&h.client, &current, &job("0 3 * * *")).unwrap();

    assert_eq!(updated.job.schedule(), Some("0 3 * * *"));
    assert_eq!(h.scheduler.route_count(Route::DeleteJob), 1);
    assert_eq!(h.scheduler.route_count(Route::CreateJob), 1 + 3);
}

#[test]
fn test_recreate_fails_when_delete_lag_outlasts_retries() {
    let h = Harness::new();
    let current = h
        .jobs
        .create(&h.client, &create_job(JobKind::Service, "slow").unwrap())
        .unwrap();

    h.scheduler.set_delete_lag(5);
    let desired = create_job(JobKind::Worker, "slow").unwrap();
    let err = h.jobs.update(&h.client, &current, &desired).unwrap_err();

    assert!(matches!(err, ReconcileError::Remote { status: 409, .. }));
    assert_eq!(err.exit_code(), 30);
}

// =============================================================================
// Remote state handling
// =============================================================================

#[test]
fn test_paused_job_exists_but_blocks() {
    let h = Harness::new();
    let created = h
        .jobs
        .create(&h.client, &create_job(JobKind::Service, "paused").unwrap())
        .unwrap();
    h.scheduler.set_job_state("paused", RequestState::Paused);

    let mut record = created.clone();
    let err = h.jobs.exists(&h.client, &mut record).unwrap_err();
    assert!(matches!(err, ReconcileError::Paused { .. }));
    assert!(err.resource_exists());
    assert_eq!(err.exit_code(), 40);
}

#[test]
fn test_cooldown_job_is_recreated() {
    let h = Harness::new();
    let job = create_job(JobKind::Service, "cool").unwrap().set_instances(2).unwrap();
    h.jobs.create(&h.client, &job).unwrap();
    h.scheduler.set_job_state("cool", RequestState::SystemCooldown);

    let mut record = JobRecord::new(job.clone());
    assert!(!h.jobs.exists(&h.client, &mut record).unwrap());
    assert!(record.needs_recreate);

    let updated = h.jobs.update(&h.client, &record, &job).unwrap();
    assert_eq!(updated.job.state, Some(RequestState::Active));
    assert!(!updated.needs_recreate);
    assert_eq!(h.scheduler.route_count(Route::DeleteJob), 1);
}

#[test]
fn test_apply_cooldown_job_recreates() {
    let h = Harness::new();
    let job = create_job(JobKind::Service, "cool").unwrap().set_instances(2).unwrap();
    h.jobs.apply(&h.client, &job).unwrap();
    h.scheduler.set_job_state("cool", RequestState::SystemCooldown);

    let applied = h.jobs.apply(&h.client, &job).unwrap();
    assert_eq!(applied.job.state, Some(RequestState::Active));
    assert_eq!(applied.job.instances(), Some(2));
    assert_eq!(h.scheduler.route_count(Route::DeleteJob), 1);
    assert_eq!(h.scheduler.route_count(Route::CreateJob), 2);
}

#[test]
fn test_missing_job_does_not_exist() {
    let h = Harness::new();
    let mut record = JobRecord::new(create_job(JobKind::Service, "ghost").unwrap());
    assert!(!h.jobs.exists(&h.client, &mut record).unwrap());
    assert!(!record.needs_recreate);
}

// =============================================================================
// Delete and import
// =============================================================================

#[test]
fn test_delete_twice_is_success() {
    let h = Harness::new();
    h.jobs
        .create(&h.client, &create_job(JobKind::RunOnce, "once").unwrap())
        .unwrap();

    h.jobs.delete(&h.client, "once").unwrap();
    h.jobs.delete(&h.client, "once").unwrap();
    assert_eq!(h.scheduler.job_count(), 0);
}

#[test]
fn test_import_existing_job() {
    let h = Harness::new();
    h.jobs
        .create(
            &h.client,
            &create_job(JobKind::OnDemand, "adhoc").unwrap().set_retries(4).unwrap(),
        )
        .unwrap();

    let imported = h.jobs.import(&h.client, "adhoc").unwrap();
    assert_eq!(imported.job.kind(), JobKind::OnDemand);
    assert_eq!(imported.job.retries(), Some(4));
}

#[test]
fn test_import_missing_job() {
    let h = Harness::new();
    let err = h.jobs.import(&h.client, "nope").unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound { resource: "job", .. }));
}
