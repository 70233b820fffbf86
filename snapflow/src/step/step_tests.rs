//! Behavior tests for the snapshot-volumes step.

use super::{SnapshotVolumesConfig, SnapshotVolumesStep, Step};
use crate::context::StepContext;
use crate::core::StepAction;
use crate::ec2::{BlockDeviceMapping, Tag};
use crate::events::CollectingUi;
use crate::testing::{instance_with, test_image, test_instance, MockEc2};
use crate::waiter::{BackoffStrategy, StateWaiter};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn fast_waiter() -> StateWaiter {
    StateWaiter::new(vec!["pending".to_string()], "completed")
        .with_backoff(BackoffStrategy::Constant(Duration::from_millis(1)))
        .with_max_wait(Duration::from_secs(60))
}

fn step(devices: &[&str], tags: &[(&str, &str)]) -> SnapshotVolumesStep {
    SnapshotVolumesStep::new(SnapshotVolumesConfig {
        do_snapshot: true,
        snapshot_devices: devices.iter().map(ToString::to_string).collect(),
        run_tags: tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        template_values: HashMap::new(),
    })
    .with_waiter(fast_waiter())
}

fn context(mock: &Arc<MockEc2>) -> StepContext {
    StepContext::new(mock.clone(), test_instance(), test_image())
}

#[tokio::test]
async fn test_noop_when_feature_disabled() {
    let mock = Arc::new(MockEc2::new());
    let step = SnapshotVolumesStep::new(SnapshotVolumesConfig {
        do_snapshot: false,
        snapshot_devices: vec!["/dev/sdb".to_string()],
        ..SnapshotVolumesConfig::default()
    });

    let action = step.run(&context(&mock)).await;

    assert_eq!(action, StepAction::Continue);
    assert!(mock.create_calls().is_empty());
}

#[tokio::test]
async fn test_noop_with_empty_allow_list() {
    let mock = Arc::new(MockEc2::new());
    let action = step(&[], &[]).run(&context(&mock)).await;

    assert_eq!(action, StepAction::Continue);
    assert!(mock.create_calls().is_empty());
}

#[tokio::test]
async fn test_noop_when_no_device_matches() {
    let mock = Arc::new(MockEc2::new());
    let ctx = context(&mock);
    let action = step(&["/dev/sdz"], &[]).run(&ctx).await;

    // Absence of matching volumes is not failure
    assert_eq!(action, StepAction::Continue);
    assert!(mock.create_calls().is_empty());
    assert!(!ctx.has_error());
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_matched_volumes_in_order() {
    let mock = Arc::new(MockEc2::new().with_pending_polls(2));
    let action = step(&["/dev/sda1", "/dev/sdb"], &[])
        .run(&context(&mock))
        .await;

    assert_eq!(action, StepAction::Continue);
    assert_eq!(
        mock.create_calls(),
        vec!["vol-aaa".to_string(), "vol-bbb".to_string()]
    );
    // Empty tag set: declared absent, zero tagging calls
    assert!(mock.tag_calls().is_empty());
}

#[tokio::test]
async fn test_selector_skips_devices_without_volumes() {
    let mock = Arc::new(MockEc2::new());
    // ephemeral0 is allow-listed but has no EBS volume behind it
    let action = step(&["/dev/sda1", "/dev/sdb", "ephemeral0"], &[])
        .run(&context(&mock))
        .await;

    assert_eq!(action, StepAction::Continue);
    assert_eq!(
        mock.create_calls(),
        vec!["vol-aaa".to_string(), "vol-bbb".to_string()]
    );
}

#[tokio::test]
async fn test_canonical_scenario() {
    let mock = Arc::new(MockEc2::new());
    let ui = Arc::new(CollectingUi::new());
    let ctx = context(&mock).with_ui(ui.clone());

    let action = step(&["/dev/sdb"], &[("env", "prod")]).run(&ctx).await;

    assert_eq!(action, StepAction::Continue);
    assert_eq!(mock.create_calls(), vec!["vol-bbb".to_string()]);

    let tag_calls = mock.tag_calls();
    assert_eq!(tag_calls.len(), 1);
    let (resources, tags) = &tag_calls[0];
    assert_eq!(resources, &vec!["snap-0001".to_string()]);
    assert_eq!(tags, &vec![Tag::new("env", "prod")]);

    assert!(ui.saw("Inspecting device"));
    assert!(ui.saw("Creating snapshot of volume vol-bbb"));
    assert!(!ctx.has_error());
}

#[tokio::test]
async fn test_create_failure_aborts_remaining_volumes() {
    let mock = Arc::new(MockEc2::new());
    mock.fail_create_for("vol-bbb");

    let instance = instance_with(vec![
        BlockDeviceMapping::ebs("/dev/sda1", "vol-aaa"),
        BlockDeviceMapping::ebs("/dev/sdb", "vol-bbb"),
        BlockDeviceMapping::ebs("/dev/sdc", "vol-ccc"),
    ]);
    let ctx = StepContext::new(mock.clone(), instance, test_image());

    let action = step(&["/dev/sda1", "/dev/sdb", "/dev/sdc"], &[("env", "prod")])
        .run(&ctx)
        .await;

    assert_eq!(action, StepAction::Halt);
    // The second create fails during its own call; the third is never issued
    assert_eq!(
        mock.create_calls(),
        vec!["vol-aaa".to_string(), "vol-bbb".to_string()]
    );
    // Exactly K-1 snapshots exist and none of them are tagged
    assert_eq!(mock.created_snapshot_ids(), vec!["snap-0001".to_string()]);
    assert!(mock.tag_calls().is_empty());
    assert!(ctx.error_message().unwrap().contains("vol-bbb"));
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_voids_whole_step() {
    let mock = Arc::new(MockEc2::new());
    mock.fail_describe_for("vol-aaa");

    let ui = Arc::new(CollectingUi::new());
    let ctx = context(&mock).with_ui(ui.clone());

    let action = step(&["/dev/sda1", "/dev/sdb"], &[("env", "prod")])
        .run(&ctx)
        .await;

    assert_eq!(action, StepAction::Halt);
    // The second volume's create is never issued
    assert_eq!(mock.create_calls(), vec!["vol-aaa".to_string()]);
    assert!(mock.tag_calls().is_empty());

    let message = ctx.error_message().unwrap();
    assert!(message.contains("snap-0001"));
    assert_eq!(ui.errors().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_snapshot_record_is_fatal() {
    let mock = Arc::new(MockEc2::new());
    mock.vanish_describe_for("vol-bbb");

    let ctx = context(&mock);
    let action = step(&["/dev/sdb"], &[]).run(&ctx).await;

    assert_eq!(action, StepAction::Halt);
    assert!(ctx.error_message().unwrap().contains("no record found"));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_error_state_is_fatal() {
    let mock = Arc::new(MockEc2::new().with_pending_polls(1));
    mock.error_state_for("vol-bbb");

    let ctx = context(&mock);
    let action = step(&["/dev/sdb"], &[]).run(&ctx).await;

    assert_eq!(action, StepAction::Halt);
    assert!(ctx.error_message().unwrap().contains("unexpected state"));
}

#[tokio::test(start_paused = true)]
async fn test_wait_timeout_is_fatal() {
    let mock = Arc::new(MockEc2::new().with_pending_polls(usize::MAX));
    let ctx = context(&mock);

    let waiter = StateWaiter::new(vec!["pending".to_string()], "completed")
        .with_backoff(BackoffStrategy::Constant(Duration::from_millis(10)))
        .with_max_wait(Duration::from_millis(50));
    let step = step(&["/dev/sdb"], &[]).with_waiter(waiter);

    let action = step.run(&ctx).await;

    assert_eq!(action, StepAction::Halt);
    assert!(ctx.error_message().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_cancellation_unwinds_as_fatal() {
    let mock = Arc::new(MockEc2::new());
    let ctx = context(&mock);
    ctx.cancel().cancel("user interrupt");

    let action = step(&["/dev/sdb"], &[]).run(&ctx).await;

    assert_eq!(action, StepAction::Halt);
    let error = ctx.take_error().unwrap();
    assert!(error.is_cancellation());
    // The create was issued before the wait observed cancellation
    assert_eq!(mock.create_calls(), vec!["vol-bbb".to_string()]);
}

#[tokio::test]
async fn test_tag_resolution_failure_keeps_snapshots() {
    let mock = Arc::new(MockEc2::new());
    let ctx = context(&mock);

    let action = step(&["/dev/sda1", "/dev/sdb"], &[("name", "{{bogus}}")])
        .run(&ctx)
        .await;

    assert_eq!(action, StepAction::Halt);
    // Both snapshots completed and are persisted; none were tagged
    assert_eq!(
        mock.created_snapshot_ids(),
        vec!["snap-0001".to_string(), "snap-0002".to_string()]
    );
    assert!(mock.tag_calls().is_empty());
    assert!(ctx.error_message().unwrap().contains("bogus"));
}

#[tokio::test]
async fn test_tag_apply_failure_halts() {
    let mock = Arc::new(MockEc2::new());
    mock.fail_create_tags();

    let ctx = context(&mock);
    let action = step(&["/dev/sdb"], &[("env", "prod")]).run(&ctx).await;

    assert_eq!(action, StepAction::Halt);
    assert_eq!(mock.tag_calls().len(), 1);
    assert!(ctx.error_message().unwrap().contains("tagging"));
}

#[tokio::test]
async fn test_tags_resolve_build_facts() {
    let mock = Arc::new(MockEc2::new().with_region("us-west-2"));
    let ctx = context(&mock);

    let action = step(&["/dev/sdb"], &[("origin", "{{source_ami}} in {{region}}")])
        .run(&ctx)
        .await;

    assert_eq!(action, StepAction::Continue);
    let (_, tags) = &mock.tag_calls()[0];
    assert_eq!(tags, &vec![Tag::new("origin", "ami-0123 in us-west-2")]);
}

#[tokio::test]
async fn test_rerun_creates_fresh_snapshots() {
    let mock = Arc::new(MockEc2::new());
    let step = step(&["/dev/sda1", "/dev/sdb"], &[]);

    assert_eq!(step.run(&context(&mock)).await, StepAction::Continue);
    assert_eq!(step.run(&context(&mock)).await, StepAction::Continue);

    // No idempotence across runs: 2N snapshots for N volumes
    assert_eq!(mock.created_snapshot_ids().len(), 4);
    assert_eq!(mock.create_calls().len(), 4);
}

#[tokio::test]
async fn test_cleanup_is_noop() {
    let mock = Arc::new(MockEc2::new());
    let ctx = context(&mock);

    step(&["/dev/sdb"], &[]).cleanup(&ctx).await;

    assert!(mock.create_calls().is_empty());
    assert!(!ctx.has_error());
}

#[test]
fn test_config_deserializes_from_template_json() {
    let json = serde_json::json!({
        "do_snapshot": true,
        "snapshot_devices": ["/dev/sdb"],
        "run_tags": {"env": "prod"},
    });

    let config: SnapshotVolumesConfig = serde_json::from_value(json).unwrap();
    assert!(config.do_snapshot);
    assert_eq!(config.snapshot_devices, vec!["/dev/sdb".to_string()]);
    assert_eq!(config.run_tags.get("env").map(String::as_str), Some("prod"));
    assert!(config.template_values.is_empty());
}

#[test]
fn test_step_name() {
    let step = step(&[], &[]);
    assert_eq!(step.name(), "snapshot_ebs_volumes");
}
