//! Workspace layout and lifecycle.
//!
//! Everything lives under one root (`mithril-data/` by default):
//! `config.json`, `modules/baseline`, `modules/build`, one directory per
//! mod, and the tracker files next to them.

pub mod mods;
pub mod prune;
pub mod trackers;

use crate::services::baseline::manifest::BaselineManifest;
use crate::services::config::ConfigService;
use crate::services::fs_utils::file_utils::{
    read_json, remove_path, rename_cross_drive_fallback, write_json,
};
use crate::types::errors::{CommandError, CommandResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKSPACE_DIR: &str = "mithril-data";
pub const BASELINE_DIR: &str = "baseline";
pub const BUILD_DIR: &str = "build";
pub const RESERVED_NAMES: [&str; 2] = [BASELINE_DIR, BUILD_DIR];

pub const MIGRATIONS_TRACKER: &str = "sql_migrations_applied.json";
pub const BINARY_PATCHES_TRACKER: &str = "binary_patches_applied.json";
pub const CORE_PATCHES_TRACKER: &str = "core_patches_applied.json";
pub const SCRIPTS_TRACKER: &str = "scripts_applied.json";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

/// What `clean` removed and what it put back.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanReport {
    pub removed: bool,
    pub restored_mods: Vec<String>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.root.join("modules")
    }

    pub fn baseline_dir(&self) -> PathBuf {
        self.modules_dir().join(BASELINE_DIR)
    }

    pub fn baseline_manifest_path(&self) -> PathBuf {
        self.baseline_dir().join("manifest.json")
    }

    pub fn baseline_dbc_dir(&self) -> PathBuf {
        self.baseline_dir().join("dbc")
    }

    pub fn baseline_addons_dir(&self) -> PathBuf {
        self.baseline_dir().join("addons")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.modules_dir().join(BUILD_DIR)
    }

    pub fn mod_dir(&self, name: &str) -> PathBuf {
        self.modules_dir().join(name)
    }

    pub fn tracker_path(&self, file_name: &str) -> PathBuf {
        self.modules_dir().join(file_name)
    }

    pub fn default_database_url(&self) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            self.modules_dir().join("dbc.sqlite").display()
        )
    }

    pub fn is_initialized(&self) -> bool {
        self.modules_dir().is_dir()
    }

    pub fn require_initialized(&self) -> CommandResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(CommandError::NotInitialized(format!(
                "No workspace at {}; run `mithril init`",
                self.root.display()
            )))
        }
    }

    /// Create the directory layout and a default config. Returns `false`
    /// when the workspace already existed.
    pub fn init(&self) -> CommandResult<bool> {
        let existed = self.is_initialized();
        fs::create_dir_all(self.baseline_dir())?;
        fs::create_dir_all(self.build_dir())?;
        self.load_config()?
            .ensure_file()
            .map_err(CommandError::Io)?;
        if !existed {
            log::info!("Initialized workspace at {}", self.root.display());
        }
        Ok(!existed)
    }

    pub fn load_config(&self) -> CommandResult<ConfigService> {
        ConfigService::load(&self.config_path()).map_err(CommandError::BadInput)
    }

    pub fn database_url(&self, config: &ConfigService) -> String {
        config
            .get_settings()
            .database_url
            .unwrap_or_else(|| self.default_database_url())
    }

    /// The baseline manifest, or `None` when no baseline was extracted.
    pub fn read_manifest(&self) -> CommandResult<Option<BaselineManifest>> {
        read_json(&self.baseline_manifest_path()).map_err(CommandError::BadInput)
    }

    pub fn load_manifest(&self) -> CommandResult<BaselineManifest> {
        self.require_initialized()?;
        self.read_manifest()?.ok_or_else(|| {
            CommandError::NotInitialized(
                "No baseline found; run `mithril baseline extract`".into(),
            )
        })
    }

    pub fn save_manifest(&self, manifest: &BaselineManifest) -> CommandResult<()> {
        write_json(&self.baseline_manifest_path(), manifest).map_err(CommandError::Io)
    }

    /// Remove the whole workspace. With `keep_mods`, mod directories are moved
    /// out first and restored into a fresh layout afterwards.
    pub fn clean(&self, keep_mods: bool) -> CommandResult<CleanReport> {
        let mut report = CleanReport::default();
        if !self.root.exists() {
            return Ok(report);
        }

        let backup_dir = self.backup_dir();
        let mut backed_up = Vec::new();
        if keep_mods && self.is_initialized() {
            for meta in mods::list_mods(self)? {
                let target = backup_dir.join(&meta.name);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                rename_cross_drive_fallback(&self.mod_dir(&meta.name), &target)?;
                backed_up.push(meta.name);
            }
        }

        remove_path(&self.root)?;
        report.removed = true;
        log::info!("Removed workspace {}", self.root.display());

        if keep_mods {
            self.init()?;
            for name in backed_up {
                rename_cross_drive_fallback(&backup_dir.join(&name), &self.mod_dir(&name))?;
                report.restored_mods.push(name);
            }
            if backup_dir.exists() {
                remove_path(&backup_dir)?;
            }
            log::info!("Restored {} mod(s)", report.restored_mods.len());
        }
        Ok(report)
    }

    fn backup_dir(&self) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_WORKSPACE_DIR.into());
        let parent = self.root.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!(
            ".{name}-mods-backup-{}",
            chrono::Utc::now().timestamp_millis()
        ))
    }
}

#[cfg(test)]
#[path = "tests/workspace_tests.rs"]
mod tests;
