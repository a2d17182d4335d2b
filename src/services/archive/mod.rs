//! Archive capability: open, list, extract, create.
//!
//! Two backends sit behind the same seam: real MPQ archives and loose
//! directories that stand in for an archive.

mod loose;
mod mpq;
mod types;

pub use loose::LooseBackend;
pub use mpq::MpqBackend;
pub use types::ArchiveFormat;

use std::path::Path;

/// Read side of an opened archive.
pub trait ArchiveReader {
    /// Internal paths of every file in the archive, as stored (usually `\`-separated).
    fn list(&mut self) -> Result<Vec<String>, String>;
    fn extract(&mut self, internal_path: &str, out_path: &Path) -> Result<(), String>;
}

/// Write side of an archive under construction.
pub trait ArchiveWriter {
    fn add(&mut self, disk_path: &Path, internal_path: &str) -> Result<(), String>;
    fn close(self: Box<Self>) -> Result<(), String>;
}

pub trait ArchiveBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>, String>;
    fn create(&self, out_path: &Path, file_count_hint: usize)
        -> Result<Box<dyn ArchiveWriter>, String>;
}

/// Backend for a configured archive format.
pub fn backend_for(format: ArchiveFormat) -> Box<dyn ArchiveBackend> {
    match format {
        ArchiveFormat::Mpq => Box::new(MpqBackend),
        ArchiveFormat::Loose => Box::new(LooseBackend),
    }
}

/// Convert an internal archive path (`\`-separated) to a relative disk path.
pub fn internal_to_relative(internal_path: &str) -> std::path::PathBuf {
    internal_path
        .split(['\\', '/'])
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect()
}

#[cfg(test)]
#[path = "tests/archive_tests.rs"]
mod tests;
