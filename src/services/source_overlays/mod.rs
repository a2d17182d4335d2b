//! Server source overlays: core diffs applied with an external tool and
//! native scripts copied into the checkout.

pub mod differ;

use crate::services::fs_utils::file_utils::hash_file;
use crate::services::workspace::mods::ModMeta;
use crate::services::workspace::trackers::{now_timestamp, CorePatchRecord, ScriptRecord, Tracker};
use crate::services::workspace::{Workspace, CORE_PATCHES_TRACKER, SCRIPTS_TRACKER};
use crate::types::errors::{CommandError, CommandResult};
use differ::DiffApplier;
use std::fs;
use std::path::{Path, PathBuf};

pub const CORE_PATCHES_DIR: &str = "core-patches";
pub const SCRIPTS_DIR: &str = "scripts";

#[derive(Debug, Default, Clone)]
pub struct SourceReport {
    pub core_patches_applied: Vec<String>,
    pub core_patches_skipped: usize,
    pub scripts_deployed: Vec<String>,
    pub scripts_unchanged: usize,
}

fn files_with_extension(dir: &Path, extensions: &[&str]) -> CommandResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension().is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|wanted| ext.eq_ignore_ascii_case(wanted))
            })
        })
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    files.sort();
    Ok(files)
}

/// Apply untracked `core-patches/*.patch` in build order. A failing diff
/// stops the run; it is not recorded.
pub fn apply_core_patches(
    workspace: &Workspace,
    source_dir: &Path,
    mods: &[ModMeta],
    applier: &mut dyn DiffApplier,
) -> CommandResult<(Vec<String>, usize)> {
    let mut tracker =
        Tracker::<CorePatchRecord>::load(&workspace.tracker_path(CORE_PATCHES_TRACKER))?;
    let mut applied = Vec::new();
    let mut skipped = 0;

    for meta in mods {
        let dir = workspace.mod_dir(&meta.name).join(CORE_PATCHES_DIR);
        for file in files_with_extension(&dir, &["patch", "diff"])? {
            if tracker.contains(|r| r.mod_name == meta.name && r.file == file) {
                skipped += 1;
                continue;
            }
            applier.apply(source_dir, &dir.join(&file)).map_err(|e| {
                log::error!("Stopped at {}/{file}", meta.name);
                CommandError::ExternalFailure(e)
            })?;
            log::info!("Applied {}/{CORE_PATCHES_DIR}/{file}", meta.name);
            tracker.push(CorePatchRecord {
                mod_name: meta.name.clone(),
                file: file.clone(),
                applied_at: now_timestamp(),
            });
            tracker.save()?;
            applied.push(format!("{}/{file}", meta.name));
        }
    }
    Ok((applied, skipped))
}

/// Where a mod's scripts land in the checkout.
pub fn scripts_destination(source_dir: &Path, scripts_subdir: &str, mod_name: &str) -> PathBuf {
    source_dir.join(scripts_subdir).join(mod_name)
}

/// Copy `scripts/*.{cpp,h}` into the checkout. Files whose checksum matches
/// the tracked one and that are still present are left alone.
pub fn deploy_scripts(
    workspace: &Workspace,
    source_dir: &Path,
    scripts_subdir: &str,
    mods: &[ModMeta],
) -> CommandResult<(Vec<String>, usize)> {
    let mut tracker = Tracker::<ScriptRecord>::load(&workspace.tracker_path(SCRIPTS_TRACKER))?;
    let mut deployed = Vec::new();
    let mut unchanged = 0;

    for meta in mods {
        let dir = workspace.mod_dir(&meta.name).join(SCRIPTS_DIR);
        let dest_dir = scripts_destination(source_dir, scripts_subdir, &meta.name);
        for file in files_with_extension(&dir, &["cpp", "h"])? {
            let checksum = hash_file(&dir.join(&file)).map_err(CommandError::Io)?;
            let dest = dest_dir.join(&file);
            let current = tracker.contains(|r| {
                r.mod_name == meta.name && r.file == file && r.checksum == checksum
            });
            if current && dest.is_file() {
                unchanged += 1;
                continue;
            }

            fs::create_dir_all(&dest_dir)?;
            fs::copy(dir.join(&file), &dest)?;
            log::info!("Deployed {}", dest.display());
            tracker.retain(|r| !(r.mod_name == meta.name && r.file == file));
            tracker.push(ScriptRecord {
                mod_name: meta.name.clone(),
                file: file.clone(),
                checksum,
            });
            deployed.push(format!("{}/{file}", meta.name));
        }
    }
    tracker.save()?;
    Ok((deployed, unchanged))
}

/// Core diffs first, then scripts.
pub fn apply_source_overlays(
    workspace: &Workspace,
    source_dir: &Path,
    scripts_subdir: &str,
    mods: &[ModMeta],
    applier: &mut dyn DiffApplier,
) -> CommandResult<SourceReport> {
    if !source_dir.is_dir() {
        return Err(CommandError::BadInput(format!(
            "Server source directory not found: {}",
            source_dir.display()
        )));
    }
    let (core_patches_applied, core_patches_skipped) =
        apply_core_patches(workspace, source_dir, mods, applier)?;
    let (scripts_deployed, scripts_unchanged) =
        deploy_scripts(workspace, source_dir, scripts_subdir, mods)?;
    Ok(SourceReport {
        core_patches_applied,
        core_patches_skipped,
        scripts_deployed,
        scripts_unchanged,
    })
}

#[cfg(test)]
#[path = "tests/source_overlays_tests.rs"]
mod tests;
