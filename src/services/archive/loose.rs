//! Directory-backed archives: `common.MPQ/DBFilesClient/Spell.dbc` reads as
//! the entry `DBFilesClient\Spell.dbc`.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{internal_to_relative, ArchiveBackend, ArchiveReader, ArchiveWriter};

#[derive(Debug, Clone, Copy, Default)]
pub struct LooseBackend;

struct LooseReader {
    root: PathBuf,
}

struct LooseWriter {
    root: PathBuf,
}

impl ArchiveBackend for LooseBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>, String> {
        if !path.is_dir() {
            return Err(format!("Not a loose archive directory: {}", path.display()));
        }
        Ok(Box::new(LooseReader {
            root: path.to_path_buf(),
        }))
    }

    fn create(
        &self,
        out_path: &Path,
        _file_count_hint: usize,
    ) -> Result<Box<dyn ArchiveWriter>, String> {
        if out_path.exists() {
            let removed = if out_path.is_dir() {
                fs::remove_dir_all(out_path)
            } else {
                fs::remove_file(out_path)
            };
            removed.map_err(|e| format!("Failed to replace {}: {e}", out_path.display()))?;
        }
        fs::create_dir_all(out_path)
            .map_err(|e| format!("Failed to create {}: {e}", out_path.display()))?;
        Ok(Box::new(LooseWriter {
            root: out_path.to_path_buf(),
        }))
    }
}

impl ArchiveReader for LooseReader {
    fn list(&mut self) -> Result<Vec<String>, String> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| format!("Failed to list {}: {e}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let internal: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            entries.push(internal.join("\\"));
        }
        Ok(entries)
    }

    fn extract(&mut self, internal_path: &str, out_path: &Path) -> Result<(), String> {
        let source = self.root.join(internal_to_relative(internal_path));
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent: {e}"))?;
        }
        fs::copy(&source, out_path)
            .map(|_| ())
            .map_err(|e| format!("Failed to extract {internal_path}: {e}"))
    }
}

impl ArchiveWriter for LooseWriter {
    fn add(&mut self, disk_path: &Path, internal_path: &str) -> Result<(), String> {
        let dest = self.root.join(internal_to_relative(internal_path));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent: {e}"))?;
        }
        fs::copy(disk_path, &dest)
            .map(|_| ())
            .map_err(|e| format!("Failed to add {}: {e}", disk_path.display()))
    }

    fn close(self: Box<Self>) -> Result<(), String> {
        Ok(())
    }
}
