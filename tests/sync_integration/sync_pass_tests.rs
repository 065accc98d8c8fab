//! Full-pass behaviour over in-memory task sources.

use crate::sync_integration::helpers::{SyncRig, fields, rig, start_time};
use chrono::TimeDelta;
use rstest::rstest;
use tasksync::sync::{
    adapters::memory::RecordedWrite,
    domain::{ClockSkewWarning, RemoteId, TaskClassification},
    services::SyncPassError,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_pass_without_changes_is_all_noop(rig: SyncRig) {
    rig.side_a
        .insert(fields("Buy milk"), start_time() - TimeDelta::hours(1));
    rig.side_a
        .insert(fields("File taxes"), start_time() - TimeDelta::hours(2));
    rig.side_b
        .insert(fields("Call plumber"), start_time() - TimeDelta::minutes(5));

    let first = rig.driver.run_once().await.expect("first pass succeeds");
    assert_eq!(first.a_to_b.created, 2);
    assert_eq!(first.b_to_a.created, 1);

    rig.clock.advance(TimeDelta::minutes(5));
    let writes_before = (rig.side_a.writes().len(), rig.side_b.writes().len());
    let second = rig.driver.run_once().await.expect("second pass succeeds");

    assert!(second.is_all_noop());
    assert_eq!(second.a_to_b.unchanged, 3);
    assert_eq!(second.b_to_a.unchanged, 3);
    assert_eq!(
        (rig.side_a.writes().len(), rig.side_b.writes().len()),
        writes_before
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_passes_never_duplicate_mirrors(rig: SyncRig) {
    rig.side_a
        .insert(fields("Buy milk"), start_time() - TimeDelta::hours(1));

    for _ in 0..3 {
        rig.driver.run_once().await.expect("pass succeeds");
        rig.clock.advance(TimeDelta::minutes(1));
    }

    assert_eq!(rig.side_a.tasks().len(), 1);
    assert_eq!(rig.side_b.tasks().len(), 1);
    let stored = rig.store.stored().expect("map persisted");
    assert_eq!(stored.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn newer_side_a_edit_overwrites_side_b_only(rig: SyncRig) {
    let id_a = rig
        .side_a
        .insert(fields("Buy milk"), start_time() - TimeDelta::hours(1));
    rig.driver.run_once().await.expect("first pass succeeds");
    let stored = rig.store.stored().expect("map persisted");
    let id_b = stored.lookup_by_a(&id_a).cloned().expect("mirror mapped");

    rig.clock.advance(TimeDelta::minutes(10));
    let edited = fields("Buy oat milk").with_completed(true);
    assert!(rig.side_a.edit(
        &id_a,
        edited.clone(),
        start_time() + TimeDelta::minutes(5)
    ));
    let report = rig.driver.run_once().await.expect("second pass succeeds");

    assert_eq!(report.a_to_b.updated, 1);
    assert_eq!(report.b_to_a.updated, 0);
    let mirror = rig.side_b.get(&id_b).expect("mirror exists");
    assert_eq!(mirror.fields(), &edited);
    assert!(rig.side_a.writes().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tied_edits_leave_both_sides_untouched(rig: SyncRig) {
    let id_a = rig
        .side_a
        .insert(fields("Buy milk"), start_time() - TimeDelta::hours(1));
    rig.driver.run_once().await.expect("first pass succeeds");
    let id_b = rig
        .store
        .stored()
        .and_then(|map| map.lookup_by_a(&id_a).cloned())
        .expect("mirror mapped");

    let tie = start_time() + TimeDelta::minutes(3);
    rig.clock.advance(TimeDelta::minutes(10));
    rig.side_a.edit(&id_a, fields("Buy milk today"), tie);
    rig.side_b.edit(&id_b, fields("Buy milk tomorrow"), tie);
    let writes_before = (rig.side_a.writes().len(), rig.side_b.writes().len());

    let report = rig.driver.run_once().await.expect("tied pass succeeds");

    assert!(report.is_all_noop());
    assert!(matches!(
        report.a_to_b.warnings.as_slice(),
        [ClockSkewWarning::TiedWithDivergentFields { .. }]
    ));
    assert_eq!(
        (rig.side_a.writes().len(), rig.side_b.writes().len()),
        writes_before
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn side_b_only_task_is_created_once_on_side_a(rig: SyncRig) {
    let id_b = rig
        .side_b
        .insert(fields("Call plumber"), start_time() - TimeDelta::minutes(30));

    let report = rig.driver.run_once().await.expect("pass succeeds");

    assert_eq!(report.b_to_a.created, 1);
    assert_eq!(report.a_to_b.created, 0);
    let created: Vec<RemoteId> = rig
        .side_a
        .writes()
        .into_iter()
        .filter_map(|write| match write {
            RecordedWrite::Created { id, .. } => Some(id),
            RecordedWrite::Updated { .. } => None,
        })
        .collect();
    let [id_a] = created.as_slice() else {
        panic!("expected exactly one create on side A, got {created:?}");
    };
    let stored = rig.store.stored().expect("map persisted");
    assert_eq!(stored.lookup_by_b(&id_b), Some(id_a));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_creates_are_retried_on_the_next_pass(rig: SyncRig) {
    for title in ["Task 1", "Task 2", "Task 3", "Task 4", "Task 5"] {
        rig.side_a
            .insert(fields(title), start_time() - TimeDelta::hours(1));
    }
    rig.side_b.reject_writes_titled("Task 2");

    let result = rig.driver.run_once().await;
    let Err(SyncPassError::IntentsFailed(report)) = result else {
        panic!("expected a partially failed pass");
    };
    assert_eq!(report.a_to_b.created, 4);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(rig.store.stored().map(|map| map.len()), Some(4));

    rig.side_b.accept_all_writes();
    rig.clock.advance(TimeDelta::minutes(1));
    let retry = rig.driver.run_once().await.expect("retry pass succeeds");

    assert_eq!(retry.a_to_b.created, 1);
    assert_eq!(retry.a_to_b.unchanged, 4);
    assert_eq!(rig.side_b.tasks().len(), 5);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_mirror_is_recreated_and_remapped(rig: SyncRig) {
    let id_a = rig
        .side_a
        .insert(fields("Buy milk"), start_time() - TimeDelta::hours(1));
    rig.driver.run_once().await.expect("first pass succeeds");
    let stale = rig
        .store
        .stored()
        .and_then(|map| map.lookup_by_a(&id_a).cloned())
        .expect("mirror mapped");

    rig.side_b.remove(&stale).expect("mirror existed");
    rig.clock.advance(TimeDelta::minutes(1));
    let report = rig.driver.run_once().await.expect("second pass succeeds");

    assert_eq!(report.a_to_b.created, 1);
    let stored = rig.store.stored().expect("map persisted");
    let fresh = stored.lookup_by_a(&id_a).expect("mirror remapped");
    assert_ne!(fresh, &stale);
    assert_eq!(stored.lookup_by_b(&stale), None);
    assert!(rig.side_b.get(fresh).is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_recreate_keeps_the_stale_pair_until_it_succeeds(rig: SyncRig) {
    let id_a = rig
        .side_a
        .insert(fields("Buy milk"), start_time() - TimeDelta::hours(1));
    rig.driver.run_once().await.expect("first pass succeeds");
    let stale = rig
        .store
        .stored()
        .and_then(|map| map.lookup_by_a(&id_a).cloned())
        .expect("mirror mapped");

    rig.side_b.remove(&stale).expect("mirror existed");
    rig.side_b.reject_writes_titled("Buy milk");
    rig.clock.advance(TimeDelta::minutes(1));
    let result = rig.driver.run_once().await;

    let Err(SyncPassError::IntentsFailed(report)) = result else {
        panic!("expected failed intents");
    };
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(
        failed.first().map(|intent| intent.classification),
        Some(TaskClassification::Unknown)
    ));
    let kept = rig.store.stored().expect("map persisted");
    assert_eq!(kept.lookup_by_a(&id_a), Some(&stale));

    rig.side_b.accept_all_writes();
    rig.clock.advance(TimeDelta::minutes(1));
    let retried = rig.driver.run_once().await.expect("retry succeeds");

    assert_eq!(retried.a_to_b.created, 1);
    let stored = rig.store.stored().expect("map persisted");
    let fresh = stored.lookup_by_a(&id_a).expect("mirror remapped");
    assert_ne!(fresh, &stale);
    assert_eq!(stored.len(), 1);
    assert_eq!(rig.side_b.tasks().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fetch_failure_leaves_the_stored_map_alone(rig: SyncRig) {
    rig.side_a
        .insert(fields("Buy milk"), start_time() - TimeDelta::hours(1));
    rig.driver.run_once().await.expect("first pass succeeds");
    let before = rig.store.stored();

    rig.side_b.fail_fetches("connection reset");
    rig.side_a
        .insert(fields("Water plants"), start_time() - TimeDelta::minutes(1));
    let result = rig.driver.run_once().await;

    assert!(matches!(result, Err(SyncPassError::Fetch(_))));
    assert_eq!(rig.store.stored(), before);
    assert_eq!(rig.store.save_count(), 1);
    assert_eq!(rig.side_b.tasks().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pass_after_fetch_recovery_catches_up(rig: SyncRig) {
    rig.side_b.fail_fetches("connection reset");
    rig.side_a
        .insert(fields("Water plants"), start_time() - TimeDelta::minutes(1));
    let failed = rig.driver.run_once().await;
    assert!(matches!(failed, Err(SyncPassError::Fetch(_))));

    rig.side_b.restore_fetches();
    let report = rig.driver.run_once().await.expect("pass succeeds");

    assert_eq!(report.a_to_b.created, 1);
    assert_eq!(rig.side_b.tasks().len(), 1);
    assert_eq!(rig.store.save_count(), 1);
}
