//! Turn the workspace's mods into deployed patch archives.

pub mod order;
pub mod stage;

pub use order::resolve_build_order;
pub use stage::{stage_mod, StagedMod};

use crate::services::archive::ArchiveBackend;
use crate::services::fs_utils::path_utils::logical_key;
use crate::services::packager::{
    assign_slots, clean_build_dir, clean_system_patches, deploy_archive, deploy_server_tables,
    locale_archive_name, selection_slots, tabular_archive_name, write_archive, PackEntry,
};
use crate::services::workspace::mods::{list_mods, ModMeta};
use crate::services::workspace::Workspace;
use crate::types::errors::{CommandError, CommandResult};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Archive contents after resolving overlaps between mods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub dbc_files: Vec<PackEntry>,
    pub addon_files: Vec<PackEntry>,
}

fn internal_path(prefix: &str, relative: &Path) -> String {
    let mut parts = vec![prefix.to_string()];
    parts.extend(
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
    );
    parts.join("\\")
}

/// Merge staged mods given in build order. The walk runs from the last mod
/// to the first and keeps the first file seen per logical path, so later
/// mods override earlier ones.
pub fn compose(staged: &[StagedMod]) -> Composition {
    let mut seen_dbc = HashSet::new();
    let mut seen_addons = HashSet::new();
    let mut composition = Composition::default();

    for mod_stage in staged.iter().rev() {
        for file in &mod_stage.dbc_files {
            if seen_dbc.insert(file.to_lowercase()) {
                composition.dbc_files.push(PackEntry {
                    disk_path: mod_stage.dbc_dir().join(file),
                    internal_path: internal_path("DBFilesClient", Path::new(file)),
                });
            }
        }
        for relative in &mod_stage.addon_files {
            if seen_addons.insert(logical_key(relative)) {
                composition.addon_files.push(PackEntry {
                    disk_path: mod_stage.addons_dir().join(relative),
                    internal_path: internal_path("Interface", relative),
                });
            }
        }
    }

    composition
        .dbc_files
        .sort_by(|a, b| a.internal_path.cmp(&b.internal_path));
    composition
        .addon_files
        .sort_by(|a, b| a.internal_path.cmp(&b.internal_path));
    composition
}

/// Where a build goes and what it may touch.
pub struct BuildOptions<'a> {
    /// Mods to build; empty means the whole workspace.
    pub selection: &'a [String],
    pub backend: &'a dyn ArchiveBackend,
    /// Relational store for `sql/dbc` migrations. Without it those
    /// migrations are skipped with a warning.
    pub pool: Option<&'a SqlitePool>,
    /// Client data directory; falls back to the baseline's.
    pub data_dir: Option<PathBuf>,
    pub server_dbc_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub mods: Vec<String>,
    pub slots: String,
    pub removed_patches: Vec<PathBuf>,
    pub tabular_archive: Option<PathBuf>,
    pub locale_archive: Option<PathBuf>,
    pub dbc_files: Vec<String>,
    pub addon_files: Vec<String>,
    pub server_tables: usize,
}

/// Selected mods in build order. An empty selection means every mod.
pub fn select_mods(order: &[ModMeta], selection: &[String]) -> CommandResult<Vec<ModMeta>> {
    if selection.is_empty() {
        return Ok(order.to_vec());
    }
    for name in selection {
        if !order.iter().any(|m| &m.name == name) {
            return Err(CommandError::BadInput(format!("Unknown mod '{name}'")));
        }
    }
    Ok(order
        .iter()
        .filter(|m| selection.contains(&m.name))
        .cloned()
        .collect())
}

/// Whether building `mods` runs tabular migrations and so needs the store.
pub fn needs_relational_store(workspace: &Workspace, mods: &[ModMeta]) -> CommandResult<bool> {
    for meta in mods {
        if stage::has_tabular_migrations(workspace, meta)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Mods to build in effective build order, with slots assigned.
pub fn plan_build(workspace: &Workspace, selection: &[String]) -> CommandResult<Vec<ModMeta>> {
    let manifest = workspace.load_manifest()?;
    let mut on_disk = list_mods(workspace)?;
    assign_slots(workspace, &mut on_disk)?;
    let order = resolve_build_order(&manifest.build_order, &on_disk);
    let selected = select_mods(&order, selection)?;
    if selected.is_empty() {
        return Err(CommandError::BadInput(
            "No mods to build; create one with `mithril mod create`".to_string(),
        ));
    }
    Ok(selected)
}

/// Stage, compose, pack and deploy. System patches already in the client
/// are removed first; a failed archive leaves none behind.
pub async fn build(workspace: &Workspace, options: BuildOptions<'_>) -> CommandResult<BuildReport> {
    let manifest = workspace.load_manifest()?;
    let selected = plan_build(workspace, options.selection)?;
    let live_mods: Vec<String> = list_mods(workspace)?.into_iter().map(|m| m.name).collect();
    clean_build_dir(&workspace.build_dir(), &live_mods)?;

    let mut staged = Vec::with_capacity(selected.len());
    for meta in &selected {
        staged.push(stage_mod(options.pool, workspace, meta).await?);
    }
    let composition = compose(&staged);

    let slot_names: Vec<&str> = selected
        .iter()
        .filter_map(|m| m.slot.as_deref())
        .collect();
    let slots = selection_slots(&slot_names, options.selection.is_empty());
    let data_dir = options
        .data_dir
        .clone()
        .unwrap_or_else(|| manifest.client_data_path.clone());
    let locale = manifest.locale.as_str();

    let mut report = BuildReport {
        mods: selected.iter().map(|m| m.name.clone()).collect(),
        slots: slots.clone(),
        dbc_files: composition
            .dbc_files
            .iter()
            .map(|e| e.internal_path.clone())
            .collect(),
        addon_files: composition
            .addon_files
            .iter()
            .map(|e| e.internal_path.clone())
            .collect(),
        ..Default::default()
    };

    report.removed_patches = clean_system_patches(&data_dir, locale)?;

    let build_dir = workspace.build_dir();
    let mut staged_archives = Vec::new();
    if !composition.dbc_files.is_empty() {
        let out = build_dir.join(tabular_archive_name(&slots));
        write_archive(options.backend, &out, &composition.dbc_files)
            .inspect_err(|_| log::error!("Build aborted; re-run `mithril build`"))?;
        staged_archives.push((out, data_dir.clone()));
    }
    if !composition.addon_files.is_empty() {
        let out = build_dir.join(locale_archive_name(locale, &slots));
        write_archive(options.backend, &out, &composition.addon_files)
            .inspect_err(|_| log::error!("Build aborted; re-run `mithril build`"))?;
        staged_archives.push((out, data_dir.join(locale)));
    }
    if staged_archives.is_empty() {
        log::warn!("Selected mods change nothing; no archive written");
    }

    for (staged_path, dest_dir) in staged_archives {
        let deployed = deploy_archive(&staged_path, &dest_dir)?;
        if dest_dir == data_dir {
            report.tabular_archive = Some(deployed);
        } else {
            report.locale_archive = Some(deployed);
        }
    }

    if let Some(server_dir) = &options.server_dbc_dir {
        report.server_tables = deploy_server_tables(server_dir, &composition.dbc_files)?;
    }

    log::info!(
        "Built {} mod(s) as slot {}: {} table(s), {} interface file(s)",
        report.mods.len(),
        report.slots,
        report.dbc_files.len(),
        report.addon_files.len()
    );
    Ok(report)
}

#[cfg(test)]
#[path = "tests/composer_tests.rs"]
mod tests;
