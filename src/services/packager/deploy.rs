//! Write patch archives and put them where the client and server read them.

use super::naming::is_system_patch;
use crate::services::archive::ArchiveBackend;
use crate::services::fs_utils::file_utils::remove_path;
use crate::types::errors::{CommandError, CommandResult};
use std::fs;
use std::path::{Path, PathBuf};

/// One file to pack: where it is on disk and its path inside the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct PackEntry {
    pub disk_path: PathBuf,
    pub internal_path: String,
}

/// Remove every system patch from the data directory and its locale
/// subdirectory. Other archives are never touched.
pub fn clean_system_patches(data_dir: &Path, locale: &str) -> CommandResult<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for dir in [data_dir.to_path_buf(), data_dir.join(locale)] {
        if !dir.is_dir() {
            continue;
        }
        let mut victims: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| is_system_patch(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.path())
            .collect();
        victims.sort();
        for path in victims {
            remove_path(&path)?;
            log::info!("Removed system patch {}", path.display());
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Drop archives from earlier builds and staging directories of mods that
/// no longer exist from the build directory.
pub fn clean_build_dir(build_dir: &Path, live_mods: &[String]) -> CommandResult<Vec<PathBuf>> {
    if !build_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut victims: Vec<PathBuf> = fs::read_dir(build_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            is_system_patch(&name) || (entry.path().is_dir() && !live_mods.contains(&name))
        })
        .map(|entry| entry.path())
        .collect();
    victims.sort();
    for path in &victims {
        remove_path(path)?;
        log::debug!("Removed stale build output {}", path.display());
    }
    Ok(victims)
}

/// Pack `entries` into `out_path`. Any failed add aborts the archive.
pub fn write_archive(
    backend: &dyn ArchiveBackend,
    out_path: &Path,
    entries: &[PackEntry],
) -> CommandResult<()> {
    let mut writer = backend
        .create(out_path, entries.len())
        .map_err(CommandError::ExternalFailure)?;
    for entry in entries {
        writer
            .add(&entry.disk_path, &entry.internal_path)
            .map_err(|e| {
                CommandError::ExternalFailure(format!(
                    "Failed to add {} to {}: {e}",
                    entry.internal_path,
                    out_path.display()
                ))
            })?;
    }
    writer.close().map_err(CommandError::ExternalFailure)?;
    log::info!("Wrote {} ({} file(s))", out_path.display(), entries.len());
    Ok(())
}

/// Copy a staged archive (file or loose directory) into `dest_dir`.
pub fn deploy_archive(staged: &Path, dest_dir: &Path) -> CommandResult<PathBuf> {
    let file_name = staged
        .file_name()
        .ok_or_else(|| CommandError::BadInput(format!("Invalid archive path {}", staged.display())))?;
    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(file_name);
    if dest.exists() {
        remove_path(&dest)?;
    }
    if staged.is_dir() {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.copy_inside = true;
        fs_extra::dir::copy(staged, &dest, &options)
            .map_err(|e| CommandError::Io(format!("Failed to deploy {}: {e}", dest.display())))?;
    } else {
        fs::copy(staged, &dest)?;
    }
    log::info!("Deployed {}", dest.display());
    Ok(dest)
}

/// Copy modified tables to the server's tabular directory, if it exists.
pub fn deploy_server_tables(server_dir: &Path, tables: &[PackEntry]) -> CommandResult<usize> {
    if !server_dir.is_dir() {
        log::warn!(
            "Server tabular directory {} not found, skipping",
            server_dir.display()
        );
        return Ok(0);
    }
    for entry in tables {
        let Some(name) = entry.disk_path.file_name() else {
            continue;
        };
        fs::copy(&entry.disk_path, server_dir.join(name))?;
    }
    Ok(tables.len())
}
