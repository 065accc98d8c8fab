//! Given steps for sync pass BDD scenarios.

use super::world::{SyncWorld, parse_date, parse_instant, run_async};
use chrono::TimeDelta;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use tasksync::sync::domain::{TaskFields, TaskTitle};

#[given(r#"a side A task "{title}" due "{due}" edited at "{edited_at}""#)]
fn side_a_task(
    world: &mut SyncWorld,
    title: String,
    due: String,
    edited_at: String,
) -> Result<(), eyre::Report> {
    let task_title = TaskTitle::new(title).wrap_err("scenario task title")?;
    let fields = TaskFields::new(task_title).with_due_date(Some(parse_date(&due)?));
    world.side_a.insert(fields, parse_instant(&edited_at)?);
    Ok(())
}

#[given(r#"side B refuses writes for "{title}""#)]
fn side_b_refuses(world: &mut SyncWorld, title: String) {
    world.side_b.reject_writes_titled(title);
}

#[given("a sync pass has run")]
fn sync_pass_has_run(world: &mut SyncWorld) -> Result<(), eyre::Report> {
    world.clock.advance(TimeDelta::minutes(1));
    run_async(world.driver.run_once()).wrap_err("run setup sync pass")?;
    Ok(())
}
