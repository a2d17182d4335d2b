//! Per-mod diffing against the baseline. Everything a mod changes lands in
//! `modules/build/<mod>/{dbc,addons}`.

use crate::database::dbc_repo::{export_modified, import_baseline};
use crate::services::csv_bridge::{baseline_csv_hash, from_csv, table_from_override, to_csv};
use crate::services::dbc::{registry, write_dbc};
use crate::services::fs_utils::file_utils::{hash_bytes, hash_file, list_files_recursive};
use crate::services::fs_utils::path_utils::logical_key;
use crate::services::migrations::{discover_database, DBC_DATABASE};
use crate::services::workspace::mods::ModMeta;
use crate::services::workspace::Workspace;
use crate::types::errors::{CommandError, CommandResult};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MOD_DBC_DIR: &str = "dbc";
pub const MOD_ADDONS_DIR: &str = "addons";

/// What one mod contributes to a build, staged on disk.
#[derive(Debug, Clone, Default)]
pub struct StagedMod {
    pub mod_name: String,
    /// Tabular file names (`Spell.dbc`) staged under `dbc/`.
    pub dbc_files: Vec<String>,
    /// Interface script paths relative to `addons/`, original case.
    pub addon_files: Vec<PathBuf>,
    pub dir: PathBuf,
}

impl StagedMod {
    pub fn dbc_dir(&self) -> PathBuf {
        self.dir.join(MOD_DBC_DIR)
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.dir.join(MOD_ADDONS_DIR)
    }
}

fn mod_dbc_migrations_dir(workspace: &Workspace, mod_name: &str) -> PathBuf {
    workspace.mod_dir(mod_name).join("sql").join(DBC_DATABASE)
}

/// Whether the mod carries migrations for the tabular store.
pub fn has_tabular_migrations(workspace: &Workspace, meta: &ModMeta) -> CommandResult<bool> {
    let dir = mod_dbc_migrations_dir(workspace, &meta.name);
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(!discover_database(&meta.name, DBC_DATABASE, &dir)?.is_empty())
}

/// Reset the store to baseline, run the mod's `sql/dbc` migrations in order
/// and export every table they changed into `out_dir`.
pub async fn stage_relational(
    pool: &SqlitePool,
    workspace: &Workspace,
    meta: &ModMeta,
    out_dir: &Path,
) -> CommandResult<Vec<String>> {
    let dir = mod_dbc_migrations_dir(workspace, &meta.name);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let migrations = discover_database(&meta.name, DBC_DATABASE, &dir)?;
    if migrations.is_empty() {
        return Ok(Vec::new());
    }

    let reset = import_baseline(pool, &workspace.baseline_dbc_dir(), true).await?;
    if !reset.imported.is_empty() {
        log::info!("Reset {} table(s) to baseline", reset.imported.len());
    }

    for migration in &migrations {
        let script = fs::read_to_string(&migration.path)?;
        sqlx::raw_sql(&script).execute(pool).await.map_err(|e| {
            CommandError::ExternalFailure(format!(
                "{}/{} failed: {e}",
                meta.name, migration.file
            ))
        })?;
        log::info!("Ran {}/sql/{DBC_DATABASE}/{}", meta.name, migration.file);
    }

    fs::create_dir_all(out_dir)?;
    let report = export_modified(pool, out_dir).await?;
    for (file, reason) in &report.skipped {
        log::warn!("{}: {file} not exported: {reason}", meta.name);
    }
    Ok(report.written)
}

/// Build tables from the mod's `dbc/<Table>.dbc.csv` overrides whose content
/// differs from the baseline rendering.
pub fn stage_csv_overrides(
    workspace: &Workspace,
    meta: &ModMeta,
    out_dir: &Path,
) -> CommandResult<Vec<String>> {
    let source_dir = workspace.mod_dir(&meta.name).join(MOD_DBC_DIR);
    let mut staged = Vec::new();
    for relative in list_files_recursive(&source_dir) {
        if relative.components().count() != 1 {
            continue;
        }
        let file_name = relative.to_string_lossy().to_string();
        let Some(table) = table_from_override(&file_name) else {
            continue;
        };
        let Some(schema) = registry().get(table) else {
            log::warn!("{}: no schema for {file_name}, ignoring", meta.name);
            continue;
        };

        let bytes = fs::read(source_dir.join(&relative))?;
        let file = from_csv(&bytes, schema)?;
        // Hash the canonical rendering so formatting-only edits are no-ops.
        let rendered = to_csv(&file, schema)?;
        if baseline_csv_hash(&workspace.baseline_dbc_dir(), schema)?.as_deref()
            == Some(hash_bytes(&rendered).as_str())
        {
            continue;
        }

        write_dbc(&out_dir.join(&schema.file), &file, schema)?;
        log::info!("{}: built {} from {file_name}", meta.name, schema.file);
        staged.push(schema.file.clone());
    }
    Ok(staged)
}

/// Case-insensitive index of the baseline interface tree.
fn baseline_addon_index(baseline_addons: &Path) -> HashMap<String, PathBuf> {
    list_files_recursive(baseline_addons)
        .into_iter()
        .map(|rel| (logical_key(&rel), baseline_addons.join(rel)))
        .collect()
}

/// Copy every interface script of the mod whose content differs from the
/// baseline file at the same logical path.
pub fn stage_addons(
    workspace: &Workspace,
    meta: &ModMeta,
    out_dir: &Path,
) -> CommandResult<Vec<PathBuf>> {
    let source_dir = workspace.mod_dir(&meta.name).join(MOD_ADDONS_DIR);
    let baseline = baseline_addon_index(&workspace.baseline_addons_dir());
    let mut staged = Vec::new();

    for relative in list_files_recursive(&source_dir) {
        let source = source_dir.join(&relative);
        let unchanged = match baseline.get(&logical_key(&relative)) {
            Some(original) => {
                hash_file(original).map_err(CommandError::Io)?
                    == hash_file(&source).map_err(CommandError::Io)?
            }
            None => false,
        };
        if unchanged {
            continue;
        }
        let dest = out_dir.join(&relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &dest)?;
        staged.push(relative);
    }
    Ok(staged)
}

/// Stage one mod from scratch. CSV overrides are built after the relational
/// export so they win for the same table.
pub async fn stage_mod(
    pool: Option<&SqlitePool>,
    workspace: &Workspace,
    meta: &ModMeta,
) -> CommandResult<StagedMod> {
    let dir = workspace.build_dir().join(&meta.name);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    let mut staged = StagedMod {
        mod_name: meta.name.clone(),
        dir,
        ..Default::default()
    };
    let dbc_dir = staged.dbc_dir();
    fs::create_dir_all(&dbc_dir)?;

    match pool {
        Some(pool) => staged.dbc_files = stage_relational(pool, workspace, meta, &dbc_dir).await?,
        None => {
            if has_tabular_migrations(workspace, meta)? {
                log::warn!(
                    "{}: sql/{DBC_DATABASE} migrations skipped, no relational store",
                    meta.name
                );
            }
        }
    }
    for file in stage_csv_overrides(workspace, meta, &dbc_dir)? {
        if !staged.dbc_files.contains(&file) {
            staged.dbc_files.push(file);
        }
    }
    staged.dbc_files.sort();

    staged.addon_files = stage_addons(workspace, meta, &staged.addons_dir())?;
    log::info!(
        "Staged {}: {} table(s), {} interface file(s)",
        meta.name,
        staged.dbc_files.len(),
        staged.addon_files.len()
    );
    Ok(staged)
}
