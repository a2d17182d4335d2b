//! MPQ archives through `wow-mpq`.

use std::fs;
use std::path::{Path, PathBuf};

use super::{ArchiveBackend, ArchiveReader, ArchiveWriter};

#[derive(Debug, Clone, Copy, Default)]
pub struct MpqBackend;

struct MpqReader {
    archive: wow_mpq::Archive,
}

struct MpqWriter {
    out_path: PathBuf,
    files: Vec<(Vec<u8>, String)>,
}

impl ArchiveBackend for MpqBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>, String> {
        let archive = wow_mpq::Archive::open(path)
            .map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
        Ok(Box::new(MpqReader { archive }))
    }

    fn create(
        &self,
        out_path: &Path,
        file_count_hint: usize,
    ) -> Result<Box<dyn ArchiveWriter>, String> {
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent: {e}"))?;
        }
        Ok(Box::new(MpqWriter {
            out_path: out_path.to_path_buf(),
            files: Vec::with_capacity(file_count_hint),
        }))
    }
}

impl ArchiveReader for MpqReader {
    fn list(&mut self) -> Result<Vec<String>, String> {
        let entries = self
            .archive
            .list()
            .map_err(|e| format!("Failed to list archive: {e}"))?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    fn extract(&mut self, internal_path: &str, out_path: &Path) -> Result<(), String> {
        let data = self
            .archive
            .read_file(internal_path)
            .map_err(|e| format!("Failed to read {internal_path}: {e}"))?;
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent: {e}"))?;
        }
        fs::write(out_path, data).map_err(|e| format!("Failed to write {}: {e}", out_path.display()))
    }
}

impl ArchiveWriter for MpqWriter {
    fn add(&mut self, disk_path: &Path, internal_path: &str) -> Result<(), String> {
        let data = fs::read(disk_path)
            .map_err(|e| format!("Failed to add {}: {e}", disk_path.display()))?;
        self.files.push((data, internal_path.to_string()));
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), String> {
        let MpqWriter { out_path, files } = *self;
        let builder = files
            .into_iter()
            .fold(wow_mpq::ArchiveBuilder::new(), |builder, (data, name)| {
                builder.add_file_data(data, &name)
            });
        builder
            .build(&out_path)
            .map_err(|e| format!("Failed to write {}: {e}", out_path.display()))
    }
}
