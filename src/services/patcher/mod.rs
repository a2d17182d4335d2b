//! Executable byte patching with a pristine `.clean` backup.
//!
//! Every apply starts from the backup and replays the tracked descriptors in
//! insertion order before adding new ones, so composition is idempotent.

pub mod descriptor;

use crate::services::fs_utils::file_utils::{hash_file, write_atomic};
use crate::services::fs_utils::path_utils::is_path_safe;
use crate::services::workspace::mods::ModMeta;
use crate::services::workspace::trackers::{
    now_timestamp, BinaryPatchKind, BinaryPatchRecord, Tracker,
};
use crate::services::workspace::{Workspace, BINARY_PATCHES_TRACKER};
use crate::types::errors::{CommandError, CommandResult};
use descriptor::{apply_overlays, PatchDescriptor};
use md5::{Digest, Md5};
use std::fs;
use std::path::{Path, PathBuf};

pub const BINARY_PATCHES_DIR: &str = "binary-patches";

#[derive(Debug, Clone, PartialEq)]
pub struct BackupStatus {
    pub created: bool,
    pub md5: String,
    pub known_good: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PatchReport {
    pub reapplied: Vec<String>,
    pub applied: Vec<String>,
    pub overlays_deployed: Vec<String>,
    pub overlays_unchanged: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PatchStatus {
    pub exe_path: PathBuf,
    pub backup: Option<BackupStatus>,
    pub tracked: Vec<BinaryPatchRecord>,
}

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

fn is_native_overlay(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"))
}

fn is_descriptor(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Files of a mod's `binary-patches/` matching `filter`, sorted by name, as
/// tracker names (`<mod>/binary-patches/<file>`).
fn mod_patch_files(
    workspace: &Workspace,
    mod_name: &str,
    filter: fn(&Path) -> bool,
) -> CommandResult<Vec<String>> {
    let dir = workspace.mod_dir(mod_name).join(BINARY_PATCHES_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<String> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && filter(path))
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    files.sort();
    Ok(files
        .into_iter()
        .map(|file| format!("{mod_name}/{BINARY_PATCHES_DIR}/{file}"))
        .collect())
}

pub struct ExePatcher<'a> {
    workspace: &'a Workspace,
    exe_path: PathBuf,
    expected_md5: String,
}

impl<'a> ExePatcher<'a> {
    pub fn new(workspace: &'a Workspace, exe_path: PathBuf, expected_md5: &str) -> Self {
        Self {
            workspace,
            exe_path,
            expected_md5: expected_md5.to_lowercase(),
        }
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    pub fn clean_path(&self) -> PathBuf {
        let mut name = self.exe_path.as_os_str().to_os_string();
        name.push(".clean");
        PathBuf::from(name)
    }

    fn tracker(&self) -> CommandResult<Tracker<BinaryPatchRecord>> {
        Tracker::load(&self.workspace.tracker_path(BINARY_PATCHES_TRACKER))
    }

    fn backup_status(&self, created: bool) -> CommandResult<BackupStatus> {
        let md5 = md5_hex(&fs::read(self.clean_path())?);
        Ok(BackupStatus {
            known_good: md5 == self.expected_md5,
            md5,
            created,
        })
    }

    /// Copy the executable to `<exe>.clean` on first use and check the
    /// backup against the known-good hash. A mismatch only warns.
    pub fn ensure_backup(&self) -> CommandResult<BackupStatus> {
        let clean = self.clean_path();
        let mut created = false;
        if !clean.exists() {
            if !self.exe_path.is_file() {
                return Err(CommandError::BadInput(format!(
                    "Executable not found: {}",
                    self.exe_path.display()
                )));
            }
            fs::copy(&self.exe_path, &clean)?;
            log::info!("Backed up {} to {}", self.exe_path.display(), clean.display());
            created = true;
        }

        let status = self.backup_status(created)?;
        if !status.known_good {
            log::warn!(
                "Backup MD5 {} does not match the supported client ({}); patch offsets may be wrong",
                status.md5,
                self.expected_md5
            );
        }
        Ok(status)
    }

    /// Source of a tracked name, which must stay inside the modules tree.
    fn source_path(&self, name: &str) -> CommandResult<PathBuf> {
        let modules = self.workspace.modules_dir();
        if !is_path_safe(&modules, Path::new(name)) {
            return Err(CommandError::Inconsistent(format!(
                "Tracked patch name {name} points outside the workspace"
            )));
        }
        Ok(modules.join(name))
    }

    fn load_overlays(&self, name: &str) -> CommandResult<Option<Vec<descriptor::ByteOverlay>>> {
        let path = self.source_path(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        let overlays = PatchDescriptor::parse(&raw)
            .and_then(|d| d.overlays())
            .inspect_err(|_| log::error!("Invalid patch descriptor {name}"))?;
        Ok(Some(overlays))
    }

    /// Restore from backup, replay tracked descriptors, then apply the
    /// untracked descriptors of `mods` and deploy their native overlays.
    pub fn apply(&self, mods: &[ModMeta]) -> CommandResult<PatchReport> {
        self.ensure_backup()?;
        let mut tracker = self.tracker()?;
        let mut report = PatchReport::default();
        let mut image = fs::read(self.clean_path())?;

        for record in tracker.entries() {
            if record.kind != BinaryPatchKind::Descriptor {
                continue;
            }
            match self.load_overlays(&record.name)? {
                Some(overlays) => {
                    apply_overlays(&mut image, &overlays)
                        .inspect_err(|_| log::error!("Failed to re-apply {}", record.name))?;
                    report.reapplied.push(record.name.clone());
                }
                None => {
                    log::warn!(
                        "Tracked patch {} no longer exists; run `mithril workspace prune`",
                        record.name
                    );
                    report.missing.push(record.name.clone());
                }
            }
        }

        let mut new_records = Vec::new();
        for meta in mods {
            for name in mod_patch_files(self.workspace, &meta.name, is_descriptor)? {
                let tracked = tracker
                    .contains(|r| r.kind == BinaryPatchKind::Descriptor && r.name == name);
                if tracked {
                    continue;
                }
                let Some(overlays) = self.load_overlays(&name)? else {
                    continue;
                };
                apply_overlays(&mut image, &overlays)
                    .inspect_err(|_| log::error!("Failed to apply {name}"))?;
                log::info!("Applied {name}");
                report.applied.push(name.clone());
                new_records.push(BinaryPatchRecord {
                    name,
                    kind: BinaryPatchKind::Descriptor,
                    applied_at: now_timestamp(),
                    checksum: None,
                });
            }
        }

        write_atomic(&self.exe_path, &image).map_err(CommandError::Io)?;
        for record in new_records {
            tracker.push(record);
        }

        for meta in mods {
            for name in mod_patch_files(self.workspace, &meta.name, is_native_overlay)? {
                self.deploy_overlay(&mut tracker, &name, &mut report)?;
            }
        }

        tracker.save()?;
        Ok(report)
    }

    fn overlay_destination(&self, name: &str) -> CommandResult<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| CommandError::BadInput(format!("Invalid overlay name {name}")))?;
        let exe_dir = self.exe_path.parent().unwrap_or_else(|| Path::new("."));
        Ok(exe_dir.join(file_name))
    }

    /// Copy a native library next to the executable unless the destination
    /// already has the same content.
    fn deploy_overlay(
        &self,
        tracker: &mut Tracker<BinaryPatchRecord>,
        name: &str,
        report: &mut PatchReport,
    ) -> CommandResult<()> {
        let source = self.source_path(name)?;
        let dest = self.overlay_destination(name)?;
        let checksum = hash_file(&source).map_err(CommandError::Io)?;

        let up_to_date = dest.is_file() && hash_file(&dest).map_err(CommandError::Io)? == checksum;
        if up_to_date {
            report.overlays_unchanged.push(name.to_string());
        } else {
            fs::copy(&source, &dest)?;
            log::info!("Deployed {}", dest.display());
            report.overlays_deployed.push(name.to_string());
        }

        tracker.retain(|r| !(r.kind == BinaryPatchKind::Overlay && r.name == name));
        tracker.push(BinaryPatchRecord {
            name: name.to_string(),
            kind: BinaryPatchKind::Overlay,
            applied_at: now_timestamp(),
            checksum: Some(checksum),
        });
        Ok(())
    }

    /// Put the clean executable back, remove deployed overlays and clear the
    /// tracker.
    pub fn restore(&self) -> CommandResult<usize> {
        let clean = self.clean_path();
        if !clean.is_file() {
            return Err(CommandError::NotInitialized(format!(
                "No backup at {}; nothing to restore",
                clean.display()
            )));
        }
        fs::copy(&clean, &self.exe_path)?;

        let mut tracker = self.tracker()?;
        let cleared = tracker.len();
        for record in tracker.entries() {
            if record.kind != BinaryPatchKind::Overlay {
                continue;
            }
            let dest = self.overlay_destination(&record.name)?;
            if dest.is_file() {
                fs::remove_file(&dest)?;
                log::info!("Removed {}", dest.display());
            }
        }
        tracker.clear();
        tracker.save()?;
        log::info!("Restored {}", self.exe_path.display());
        Ok(cleared)
    }

    pub fn status(&self) -> CommandResult<PatchStatus> {
        let backup = if self.clean_path().is_file() {
            Some(self.backup_status(false)?)
        } else {
            None
        };
        Ok(PatchStatus {
            exe_path: self.exe_path.clone(),
            backup,
            tracked: self.tracker()?.entries().to_vec(),
        })
    }
}

#[cfg(test)]
#[path = "tests/patcher_tests.rs"]
mod tests;
