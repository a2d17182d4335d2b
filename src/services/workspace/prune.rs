//! Reconcile trackers with what is on disk.

use super::trackers::{
    BinaryPatchRecord, CorePatchRecord, MigrationRecord, ScriptRecord, Tracker,
};
use super::{
    Workspace, BINARY_PATCHES_TRACKER, CORE_PATCHES_TRACKER, MIGRATIONS_TRACKER,
    SCRIPTS_TRACKER,
};
use crate::types::errors::CommandResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PruneReport {
    pub migrations: usize,
    pub binary_patches: usize,
    pub core_patches: usize,
    pub scripts: usize,
}

impl PruneReport {
    pub fn total(&self) -> usize {
        self.migrations + self.binary_patches + self.core_patches + self.scripts
    }
}

pub fn migration_source(workspace: &Workspace, record: &MigrationRecord) -> PathBuf {
    workspace
        .mod_dir(&record.mod_name)
        .join("sql")
        .join(&record.database)
        .join(&record.file)
}

pub fn binary_patch_source(workspace: &Workspace, record: &BinaryPatchRecord) -> PathBuf {
    workspace.modules_dir().join(&record.name)
}

pub fn core_patch_source(workspace: &Workspace, record: &CorePatchRecord) -> PathBuf {
    workspace
        .mod_dir(&record.mod_name)
        .join("core-patches")
        .join(&record.file)
}

pub fn script_source(workspace: &Workspace, record: &ScriptRecord) -> PathBuf {
    workspace
        .mod_dir(&record.mod_name)
        .join("scripts")
        .join(&record.file)
}

fn prune_one<T: Serialize + DeserializeOwned>(
    workspace: &Workspace,
    file_name: &str,
    source: impl Fn(&Workspace, &T) -> PathBuf,
) -> CommandResult<usize> {
    let mut tracker = Tracker::<T>::load(&workspace.tracker_path(file_name))?;
    let removed = tracker.retain(|entry| source(workspace, entry).exists());
    for entry in &removed {
        log::info!(
            "Pruned {file_name} entry for missing {}",
            source(workspace, entry).display()
        );
    }
    if !removed.is_empty() {
        tracker.save()?;
    }
    Ok(removed.len())
}

/// Drop every tracker entry whose mod or source file no longer exists.
pub fn prune_trackers(workspace: &Workspace) -> CommandResult<PruneReport> {
    workspace.require_initialized()?;
    Ok(PruneReport {
        migrations: prune_one(workspace, MIGRATIONS_TRACKER, migration_source)?,
        binary_patches: prune_one(workspace, BINARY_PATCHES_TRACKER, binary_patch_source)?,
        core_patches: prune_one(workspace, CORE_PATCHES_TRACKER, core_patch_source)?,
        scripts: prune_one(workspace, SCRIPTS_TRACKER, script_source)?,
    })
}
