//! Mod directories and their `mod.json` metadata.

use super::{Workspace, RESERVED_NAMES};
use crate::services::fs_utils::file_utils::{read_json, remove_path, write_json};
use crate::types::errors::{CommandError, CommandResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MOD_META_FILE: &str = "mod.json";

/// Subdirectories seeded by `create_mod`.
const MOD_SUBDIRS: [&str; 5] = ["addons", "sql", "binary-patches", "core-patches", "scripts"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    /// Archive slot, assigned on first build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
}

impl ModMeta {
    pub fn new(name: &str, description: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            description,
            created_at: chrono::Utc::now().to_rfc3339(),
            slot: None,
        }
    }
}

/// Mod names become directory and archive-adjacent identifiers: no path
/// separators, dots or whitespace, and not a reserved directory.
pub fn validate_mod_name(name: &str) -> CommandResult<()> {
    if name.is_empty() {
        return Err(CommandError::BadInput("Mod name is empty".into()));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| *c == '/' || *c == '\\' || *c == '.' || c.is_whitespace())
    {
        return Err(CommandError::BadInput(format!(
            "Mod name '{name}' contains invalid character {bad:?}"
        )));
    }
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(CommandError::BadInput(format!("Mod name '{name}' is reserved")));
    }
    Ok(())
}

pub fn read_mod_meta(mod_dir: &Path) -> CommandResult<Option<ModMeta>> {
    read_json(&mod_dir.join(MOD_META_FILE)).map_err(CommandError::BadInput)
}

pub fn write_mod_meta(mod_dir: &Path, meta: &ModMeta) -> CommandResult<()> {
    write_json(&mod_dir.join(MOD_META_FILE), meta).map_err(CommandError::Io)
}

pub fn create_mod(
    workspace: &Workspace,
    name: &str,
    description: Option<String>,
) -> CommandResult<ModMeta> {
    workspace.require_initialized()?;
    validate_mod_name(name)?;

    let mod_dir = workspace.mod_dir(name);
    if mod_dir.exists() {
        return Err(CommandError::Conflict(format!("Mod '{name}' already exists")));
    }
    for sub in MOD_SUBDIRS {
        fs::create_dir_all(mod_dir.join(sub))?;
    }

    let meta = ModMeta::new(name, description);
    write_mod_meta(&mod_dir, &meta)?;
    log::info!("Created mod '{name}'");
    Ok(meta)
}

/// Every mod on disk, sorted by directory name. Directories without a
/// `mod.json` are not mods and are skipped.
pub fn list_mods(workspace: &Workspace) -> CommandResult<Vec<ModMeta>> {
    workspace.require_initialized()?;

    let mut dirs: Vec<String> = fs::read_dir(workspace.modules_dir())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| !RESERVED_NAMES.contains(&name.as_str()))
        .collect();
    dirs.sort();

    let mut mods = Vec::with_capacity(dirs.len());
    for dir_name in dirs {
        let mod_dir = workspace.mod_dir(&dir_name);
        match read_mod_meta(&mod_dir) {
            Ok(Some(mut meta)) => {
                // The directory name is authoritative.
                meta.name = dir_name;
                mods.push(meta);
            }
            Ok(None) => {
                log::warn!("Skipping {}: no {MOD_META_FILE}", mod_dir.display());
            }
            Err(e) => log::warn!("Skipping {}: {e}", mod_dir.display()),
        }
    }
    Ok(mods)
}

pub fn require_mod(workspace: &Workspace, name: &str) -> CommandResult<ModMeta> {
    let mod_dir = workspace.mod_dir(name);
    if validate_mod_name(name).is_err() || !mod_dir.is_dir() {
        return Err(CommandError::BadInput(format!("Unknown mod '{name}'")));
    }
    read_mod_meta(&mod_dir)?
        .map(|mut meta| {
            meta.name = name.to_string();
            meta
        })
        .ok_or_else(|| CommandError::BadInput(format!("Unknown mod '{name}'")))
}

/// Delete a mod directory and drop it from the build order. Tracker entries
/// pointing at it are left for `workspace prune`.
pub fn remove_mod(workspace: &Workspace, name: &str) -> CommandResult<()> {
    require_mod(workspace, name)?;
    remove_path(&workspace.mod_dir(name))?;

    if let Some(mut manifest) = workspace.read_manifest()? {
        let before = manifest.build_order.len();
        manifest.build_order.retain(|entry| entry != name);
        if manifest.build_order.len() != before {
            workspace.save_manifest(&manifest)?;
        }
    }
    log::info!("Removed mod '{name}'");
    Ok(())
}

/// Replace the explicit build order. Every name must be an existing mod,
/// listed once.
pub fn set_build_order(workspace: &Workspace, order: &[String]) -> CommandResult<()> {
    let mut manifest = workspace.load_manifest()?;
    let mut seen = std::collections::HashSet::new();
    for name in order {
        require_mod(workspace, name)?;
        if !seen.insert(name.as_str()) {
            return Err(CommandError::BadInput(format!(
                "Mod '{name}' is listed twice"
            )));
        }
    }
    manifest.build_order = order.to_vec();
    workspace.save_manifest(&manifest)
}
