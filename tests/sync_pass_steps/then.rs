//! Then steps for sync pass BDD scenarios.

use super::world::{SyncWorld, parse_date};
use rstest_bdd_macros::then;
use tasksync::sync::{
    domain::{ClockSkewWarning, Side},
    services::{PassReport, SyncPassError},
};

fn successful_report(world: &SyncWorld) -> Result<&PassReport, eyre::Report> {
    match world.last_result.as_ref() {
        Some(Ok(report)) => Ok(report),
        Some(Err(err)) => Err(eyre::eyre!("expected a successful pass, got {err}")),
        None => Err(eyre::eyre!("no sync pass has run in this scenario")),
    }
}

#[then("side {side} holds {count:usize} tasks")]
fn side_holds(world: &SyncWorld, side: String, count: usize) -> Result<(), eyre::Report> {
    let source = match side.as_str() {
        "A" => world.source(Side::A),
        "B" => world.source(Side::B),
        other => return Err(eyre::eyre!("unknown side '{other}' in scenario")),
    };
    let held = source.tasks().len();
    if held != count {
        return Err(eyre::eyre!("expected {count} tasks on side {side}, found {held}"));
    }
    Ok(())
}

#[then(r#"side B has an open task "{title}" due "{due}""#)]
fn side_b_has_open_task(world: &SyncWorld, title: String, due: String) -> Result<(), eyre::Report> {
    let task = world.task_titled(Side::B, &title)?;
    if task.completed() {
        return Err(eyre::eyre!("side B task '{title}' is unexpectedly completed"));
    }
    let expected = parse_date(&due)?;
    if task.due_date() != Some(expected) {
        return Err(eyre::eyre!(
            "expected due date {expected}, found {:?}",
            task.due_date()
        ));
    }
    Ok(())
}

#[then("the identity map holds {count:usize} entries")]
fn identity_map_holds(world: &SyncWorld, count: usize) -> Result<(), eyre::Report> {
    let stored = world
        .store
        .stored()
        .ok_or_else(|| eyre::eyre!("identity map was never persisted"))?;
    if stored.len() != count {
        return Err(eyre::eyre!(
            "expected {count} identity map entries, found {}",
            stored.len()
        ));
    }
    Ok(())
}

#[then("the pass made no changes")]
fn pass_made_no_changes(world: &SyncWorld) -> Result<(), eyre::Report> {
    let report = successful_report(world)?;
    if !report.is_all_noop() {
        return Err(eyre::eyre!("expected an all no-op pass, got {report:?}"));
    }
    Ok(())
}

#[then(r#"the side A task "{title}" is completed"#)]
fn side_a_task_completed(world: &SyncWorld, title: String) -> Result<(), eyre::Report> {
    successful_report(world)?;
    let task = world.task_titled(Side::A, &title)?;
    if !task.completed() {
        return Err(eyre::eyre!("side A task '{title}' is still open"));
    }
    Ok(())
}

#[then("the pass reports {count:usize} failed intents")]
fn pass_reports_failures(world: &SyncWorld, count: usize) -> Result<(), eyre::Report> {
    let Some(Err(SyncPassError::IntentsFailed(report))) = world.last_result.as_ref() else {
        return Err(eyre::eyre!(
            "expected failed intents, got {:?}",
            world.last_result
        ));
    };
    let failed = report.failed().count();
    if failed != count {
        return Err(eyre::eyre!("expected {count} failed intents, found {failed}"));
    }
    Ok(())
}

#[then("the pass warned about tied timestamps")]
fn pass_warned_about_ties(world: &SyncWorld) -> Result<(), eyre::Report> {
    let report = successful_report(world)?;
    let tied = report
        .a_to_b
        .warnings
        .iter()
        .chain(&report.b_to_a.warnings)
        .any(|warning| matches!(warning, ClockSkewWarning::TiedWithDivergentFields { .. }));
    if !tied {
        return Err(eyre::eyre!("expected a tied timestamp warning"));
    }
    Ok(())
}
