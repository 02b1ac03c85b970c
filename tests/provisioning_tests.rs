mod common;

use common::{CreateBehavior, FakeLogging, COMPARTMENT};
use oci_key_rotation_audit::error::ScanError;
use oci_key_rotation_audit::provisioning::{
    LifecycleState, ProvisionPath, ProvisionPolicy, Provisioner, Scope, LOG_GROUP_NAME,
    LOG_STREAM_NAME,
};
use std::time::Duration;
use tokio::time::Instant;

const GROUP_ID: &str = "ocid1.loggroup.oc1..g";
const STREAM_ID: &str = "ocid1.log.oc1..s";

fn group_scope() -> Scope {
    Scope::Compartment(COMPARTMENT.to_string())
}

#[tokio::test(start_paused = true)]
async fn test_active_group_returned_without_polling() {
    let fake = FakeLogging::new()
        .with_group(GROUP_ID, LOG_GROUP_NAME, LifecycleState::Active, None);
    let provisioner = Provisioner::new(&fake, ProvisionPolicy::default());

    let started = Instant::now();
    let group = provisioner.ensure_active(&group_scope(), LOG_GROUP_NAME).await.unwrap();

    assert_eq!(group.id, GROUP_ID);
    assert_eq!(group.path, ProvisionPath::AlreadyActive);
    assert!(fake.creates().is_empty());
    assert_eq!(fake.list_calls(), 1);
    assert_eq!(fake.get_calls(), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_ensure_active_is_idempotent() {
    let fake = FakeLogging::new();
    let provisioner = Provisioner::new(&fake, ProvisionPolicy::default());

    let first = provisioner.ensure_active(&group_scope(), LOG_GROUP_NAME).await.unwrap();
    let second = provisioner.ensure_active(&group_scope(), LOG_GROUP_NAME).await.unwrap();

    assert_eq!(first.path, ProvisionPath::Created);
    assert_eq!(second.path, ProvisionPath::AlreadyActive);
    assert_eq!(first.id, second.id);
    assert_eq!(fake.creates().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_created_group_ready_after_k_polls() {
    let k = 4;
    let fake = FakeLogging::new().created_activate_on(Some(k));
    let policy = ProvisionPolicy::default();
    let provisioner = Provisioner::new(&fake, policy);

    let started = Instant::now();
    let group = provisioner.ensure_active(&group_scope(), LOG_GROUP_NAME).await.unwrap();

    assert_eq!(group.path, ProvisionPath::Created);
    // one lookup before creating, then k polls by name
    assert_eq!(fake.list_calls(), 1 + k);
    assert_eq!(started.elapsed(), policy.create.interval * k as u32);
    assert_eq!(
        fake.creates(),
        vec![(COMPARTMENT.to_string(), LOG_GROUP_NAME.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_created_group_that_never_activates_times_out() {
    let fake = FakeLogging::new().created_activate_on(None);
    let policy = ProvisionPolicy::default();
    let provisioner = Provisioner::new(&fake, policy);

    let started = Instant::now();
    let err = provisioner
        .ensure_active(&group_scope(), LOG_GROUP_NAME)
        .await
        .unwrap_err();

    match &err {
        ScanError::ProvisioningTimeout { entity, name, elapsed } => {
            assert_eq!(*entity, "log group");
            assert_eq!(name, LOG_GROUP_NAME);
            assert!(*elapsed >= policy.create.max_wait);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= policy.create.max_wait);
    assert!(started.elapsed() < policy.create.max_wait + policy.create.interval);
    assert!(err.to_string().contains("did not become ACTIVE"));
}

#[tokio::test(start_paused = true)]
async fn test_existing_inactive_group_uses_short_budget() {
    let fake = FakeLogging::new()
        .with_group(GROUP_ID, LOG_GROUP_NAME, LifecycleState::Creating, None);
    let policy = ProvisionPolicy::default();
    let provisioner = Provisioner::new(&fake, policy);

    let started = Instant::now();
    let err = provisioner
        .ensure_active(&group_scope(), LOG_GROUP_NAME)
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::ProvisioningTimeout { .. }));
    assert!(started.elapsed() >= policy.reuse.max_wait);
    assert!(started.elapsed() < policy.create.max_wait);
    assert!(fake.creates().is_empty());
    // polled by id, not by re-listing
    assert_eq!(fake.list_calls(), 1);
    assert_eq!(
        fake.get_calls() as u32,
        policy.reuse.max_wait.as_secs() as u32 / policy.reuse.interval.as_secs() as u32
    );
}

#[tokio::test(start_paused = true)]
async fn test_existing_creating_group_is_reused_once_active() {
    // observation 1 is the initial lookup, so this turns ACTIVE on the 2nd poll
    let fake = FakeLogging::new()
        .with_group(GROUP_ID, LOG_GROUP_NAME, LifecycleState::Creating, Some(3));
    let provisioner = Provisioner::new(&fake, ProvisionPolicy::default());

    let group = provisioner.ensure_active(&group_scope(), LOG_GROUP_NAME).await.unwrap();

    assert_eq!(group.id, GROUP_ID);
    assert_eq!(group.path, ProvisionPath::Reused);
    assert_eq!(fake.get_calls(), 2);
    assert!(fake.creates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_existing_creating_stream_is_reused_by_id() {
    let fake = FakeLogging::new()
        .with_group(GROUP_ID, LOG_GROUP_NAME, LifecycleState::Active, None)
        .with_stream(
            STREAM_ID,
            GROUP_ID,
            LOG_STREAM_NAME,
            LifecycleState::Creating,
            Some(3),
        );
    let policy = ProvisionPolicy::default();
    let provisioner = Provisioner::new(&fake, policy);

    let started = Instant::now();
    let stream = provisioner
        .ensure_active(&Scope::LogGroup(GROUP_ID.into()), LOG_STREAM_NAME)
        .await
        .unwrap();

    assert_eq!(stream.id, STREAM_ID);
    assert_eq!(stream.path, ProvisionPath::Reused);
    // one listing, then polled through get_log
    assert_eq!(fake.list_calls(), 1);
    assert_eq!(fake.get_calls(), 2);
    assert_eq!(started.elapsed(), policy.reuse.interval * 2);
    assert!(fake.creates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_conflict_on_create_falls_back_to_polling() {
    let fake = FakeLogging::new()
        .create_behavior(CreateBehavior::Conflict)
        .created_activate_on(Some(2));
    let provisioner = Provisioner::new(&fake, ProvisionPolicy::default());

    let group = provisioner.ensure_active(&group_scope(), LOG_GROUP_NAME).await.unwrap();

    assert_eq!(group.path, ProvisionPath::CreatedConcurrently);
    assert_eq!(group.id, "ocid1.loggroup.oc1..1");
    assert_eq!(fake.creates().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_create_failure_is_fatal() {
    let fake = FakeLogging::new().create_behavior(CreateBehavior::Fail);
    let provisioner = Provisioner::new(&fake, ProvisionPolicy::default());

    let err = provisioner
        .ensure_active(&group_scope(), LOG_GROUP_NAME)
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Provisioning { entity: "log group", .. }));
}

#[tokio::test(start_paused = true)]
async fn test_ensure_sink_creates_stream_inside_group() {
    let fake = FakeLogging::new()
        .with_group(GROUP_ID, LOG_GROUP_NAME, LifecycleState::Active, None);
    let provisioner = Provisioner::new(&fake, ProvisionPolicy::default());

    let sink = provisioner
        .ensure_sink(COMPARTMENT, LOG_GROUP_NAME, LOG_STREAM_NAME)
        .await
        .unwrap();

    assert_eq!(sink.log_group_id(), GROUP_ID);
    assert_eq!(sink.log_id(), "ocid1.log.oc1..1");
    assert_eq!(
        fake.creates(),
        vec![(GROUP_ID.to_string(), LOG_STREAM_NAME.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stream_timeout_names_stream() {
    let fake = FakeLogging::new()
        .with_group(GROUP_ID, LOG_GROUP_NAME, LifecycleState::Active, None)
        .created_activate_on(None);
    let provisioner = Provisioner::new(&fake, ProvisionPolicy::default());

    let err = provisioner
        .ensure_sink(COMPARTMENT, LOG_GROUP_NAME, LOG_STREAM_NAME)
        .await
        .unwrap_err();

    match err {
        ScanError::ProvisioningTimeout { entity, name, .. } => {
            assert_eq!(entity, "log stream");
            assert_eq!(name, LOG_STREAM_NAME);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}
