use crate::error::Error;

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use log::{info, warn};
use std::path::Path;
use std::process::Command;

/// Friday of the week of `today`. Datasets are published weekly and commits
/// are labelled with that Friday.
pub fn snapshot_date(today: NaiveDate) -> NaiveDate {
    let offset = 4 - i64::from(today.weekday().num_days_from_monday());
    today + TimeDelta::days(offset)
}

/// The git invocations of a snapshot, one commit per output group.
pub fn snapshot_commands(datasets_dir: &Path, date: NaiveDate) -> Vec<Vec<String>> {
    let groups = [
        ("stops*", "Stops"),
        ("route-patterns", "Routes"),
        ("shapes", "Shapes"),
    ];
    let mut commands = Vec::new();
    for (pathspec, label) in groups {
        commands.push(vec![
            "git".to_owned(),
            "add".to_owned(),
            datasets_dir.join(pathspec).to_string_lossy().into_owned(),
        ]);
        commands.push(vec![
            "git".to_owned(),
            "commit".to_owned(),
            "-m".to_owned(),
            format!("{} {}.", label, date.format("%Y-%m-%d")),
        ]);
    }
    commands
}

/// Commits the datasets. A git command that exits with an error (e.g.
/// nothing to commit) is logged and the next one still runs. Returns the
/// number of failed commands.
pub fn snapshot(datasets_dir: &Path) -> Result<usize, Error> {
    let date = snapshot_date(Local::now().date_naive());
    let mut failed = 0;
    for cmd in snapshot_commands(datasets_dir, date) {
        info!(">>> {}", cmd.join(" "));
        let status = Command::new(&cmd[0]).args(&cmd[1..]).status()?;
        if !status.success() {
            warn!("{} exited with {}", cmd.join(" "), status);
            failed += 1;
        }
    }
    Ok(failed)
}
