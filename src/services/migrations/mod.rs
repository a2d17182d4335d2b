//! Ordered forward/rollback text-script migrations with a tracker.
//!
//! Layout: `<mod>/sql/<database>/NNN_name.sql` with an optional sibling
//! `NNN_name.rollback.sql`. The `dbc` database belongs to the build and is
//! never run here.

pub mod runner;

use crate::services::workspace::mods::{require_mod, ModMeta};
use crate::services::workspace::trackers::{now_timestamp, MigrationRecord, Tracker};
use crate::services::workspace::{Workspace, MIGRATIONS_TRACKER};
use crate::types::errors::{CommandError, CommandResult};
use regex::Regex;
use runner::ScriptRunner;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Database label consumed by the build's relational path.
pub const DBC_DATABASE: &str = "dbc";

static MIGRATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)_.+\.sql$").expect("valid migration regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub mod_name: String,
    pub database: String,
    pub file: String,
    pub number: u64,
    pub path: PathBuf,
    pub rollback_path: Option<PathBuf>,
}

impl Migration {
    pub fn matches(&self, record: &MigrationRecord) -> bool {
        record.mod_name == self.mod_name
            && record.database == self.database
            && record.file == self.file
    }
}

pub fn rollback_name(file: &str) -> String {
    match file.strip_suffix(".sql") {
        Some(stem) => format!("{stem}.rollback.sql"),
        None => format!("{file}.rollback.sql"),
    }
}

/// Forward migrations of one database directory, in numeric order.
pub fn discover_database(mod_name: &str, database: &str, dir: &Path) -> CommandResult<Vec<Migration>> {
    let mut migrations = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let file = entry.file_name().to_string_lossy().to_string();
        if file.ends_with(".rollback.sql") {
            continue;
        }
        let Some(caps) = MIGRATION_RE.captures(&file) else {
            if file.to_lowercase().ends_with(".sql") {
                log::warn!(
                    "Ignoring {}: migration scripts are named NNN_name.sql",
                    entry.path().display()
                );
            }
            continue;
        };
        let number = caps[1].parse::<u64>().map_err(|e| {
            CommandError::BadInput(format!("Bad migration number in {file}: {e}"))
        })?;
        let rollback = dir.join(rollback_name(&file));
        migrations.push(Migration {
            mod_name: mod_name.to_string(),
            database: database.to_string(),
            number,
            path: entry.path(),
            rollback_path: rollback.is_file().then_some(rollback),
            file,
        });
    }
    migrations.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.file.cmp(&b.file)));
    Ok(migrations)
}

/// Every migration of a mod across its databases, ordered by number, then
/// file name, then database.
pub fn discover_mod(workspace: &Workspace, mod_name: &str) -> CommandResult<Vec<Migration>> {
    let sql_dir = workspace.mod_dir(mod_name).join("sql");
    if !sql_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut all = Vec::new();
    for entry in fs::read_dir(&sql_dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            let database = entry.file_name().to_string_lossy().to_string();
            all.extend(discover_database(mod_name, &database, &entry.path())?);
        }
    }
    all.sort_by(|a, b| {
        a.number
            .cmp(&b.number)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.database.cmp(&b.database))
    });
    Ok(all)
}

#[derive(Debug, Default, Clone)]
pub struct ApplyReport {
    pub applied: Vec<MigrationRecord>,
    pub already_applied: usize,
}

/// Apply pending migrations, mods in build order. Each success is recorded
/// immediately; the first failure stops the run and is not recorded.
pub fn apply_migrations(
    workspace: &Workspace,
    build_order: &[ModMeta],
    runner: &mut dyn ScriptRunner,
) -> CommandResult<ApplyReport> {
    let mut tracker = Tracker::<MigrationRecord>::load(&workspace.tracker_path(MIGRATIONS_TRACKER))?;
    let mut report = ApplyReport::default();

    for meta in build_order {
        for migration in discover_mod(workspace, &meta.name)? {
            if migration.database == DBC_DATABASE {
                continue;
            }
            if tracker.contains(|r| migration.matches(r)) {
                report.already_applied += 1;
                continue;
            }

            log::info!(
                "Applying {}/{}/{}",
                migration.mod_name,
                migration.database,
                migration.file
            );
            runner.run(&migration.database, &migration.path).map_err(|e| {
                log::error!("Migration {}/{} failed", migration.mod_name, migration.file);
                CommandError::ExternalFailure(format!(
                    "{}/{}/{}: {e}",
                    migration.mod_name, migration.database, migration.file
                ))
            })?;

            let record = MigrationRecord {
                mod_name: migration.mod_name.clone(),
                file: migration.file.clone(),
                database: migration.database.clone(),
                applied_at: now_timestamp(),
            };
            tracker.push(record.clone());
            tracker.save()?;
            report.applied.push(record);
        }
    }
    Ok(report)
}

#[derive(Debug, Clone)]
pub struct RollbackReport {
    pub rolled_back: MigrationRecord,
    pub reapplied: Option<MigrationRecord>,
}

/// Roll back the most recent applied migration of a mod, or the named one.
/// With `reapply`, the forward script runs again right after.
pub fn rollback_migration(
    workspace: &Workspace,
    mod_name: &str,
    file: Option<&str>,
    reapply: bool,
    runner: &mut dyn ScriptRunner,
) -> CommandResult<RollbackReport> {
    require_mod(workspace, mod_name)?;
    let mut tracker = Tracker::<MigrationRecord>::load(&workspace.tracker_path(MIGRATIONS_TRACKER))?;

    let target = tracker
        .entries()
        .iter()
        .rev()
        .find(|r| r.mod_name == mod_name && file.map_or(true, |f| r.file == f))
        .cloned()
        .ok_or_else(|| {
            CommandError::BadInput(match file {
                Some(f) => format!("Migration {mod_name}/{f} is not applied"),
                None => format!("No applied migrations for mod '{mod_name}'"),
            })
        })?;

    let dir = workspace
        .mod_dir(mod_name)
        .join("sql")
        .join(&target.database);
    let rollback = dir.join(rollback_name(&target.file));
    if !rollback.is_file() {
        return Err(CommandError::BadInput(format!(
            "No rollback script {} for {mod_name}/{}",
            rollback_name(&target.file),
            target.file
        )));
    }

    log::info!("Rolling back {mod_name}/{}/{}", target.database, target.file);
    runner
        .run(&target.database, &rollback)
        .map_err(|e| CommandError::ExternalFailure(format!("{}: {e}", rollback.display())))?;
    tracker.retain(|r| r != &target);
    tracker.save()?;

    let mut reapplied = None;
    if reapply {
        let forward = dir.join(&target.file);
        if !forward.is_file() {
            return Err(CommandError::Inconsistent(format!(
                "Forward script {} is missing",
                forward.display()
            )));
        }
        runner
            .run(&target.database, &forward)
            .map_err(|e| CommandError::ExternalFailure(format!("{}: {e}", forward.display())))?;
        let record = MigrationRecord {
            applied_at: now_timestamp(),
            ..target.clone()
        };
        tracker.push(record.clone());
        tracker.save()?;
        reapplied = Some(record);
    }

    Ok(RollbackReport {
        rolled_back: target,
        reapplied,
    })
}

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub migration: Migration,
    pub applied_at: Option<String>,
}

/// Every server migration in build order with its tracker state.
pub fn migration_status(
    workspace: &Workspace,
    build_order: &[ModMeta],
) -> CommandResult<Vec<MigrationStatus>> {
    let tracker = Tracker::<MigrationRecord>::load(&workspace.tracker_path(MIGRATIONS_TRACKER))?;
    let mut status = Vec::new();
    for meta in build_order {
        for migration in discover_mod(workspace, &meta.name)? {
            if migration.database == DBC_DATABASE {
                continue;
            }
            let applied_at = tracker
                .entries()
                .iter()
                .find(|r| migration.matches(r))
                .map(|r| r.applied_at.clone());
            status.push(MigrationStatus {
                migration,
                applied_at,
            });
        }
    }
    Ok(status)
}

#[cfg(test)]
#[path = "tests/migrations_tests.rs"]
mod tests;
