use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Tries to rename a file or directory using `std::fs::rename`.
/// If it fails (likely due to cross-device link errors), it falls back
/// to using `fs_extra` to copy and remove the original.
pub fn rename_cross_drive_fallback(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::warn!(
                "fs::rename failed (cross-device?): {}. Attempting fallback move...",
                e
            );

            if !from.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Source path does not exist",
                ));
            }

            if to.exists() {
                return Err(e);
            }

            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }

            if from.is_dir() {
                let mut options = fs_extra::dir::CopyOptions::new();
                options.copy_inside = true;

                fs_extra::dir::move_dir(from, to, &options)
                    .map(|_| ())
                    .map_err(|err| std::io::Error::other(err.to_string()))
            } else {
                let mut options = fs_extra::file::CopyOptions::new();
                options.overwrite = false;

                fs_extra::file::move_file(from, to, &options)
                    .map(|_| ())
                    .map_err(|err| std::io::Error::other(err.to_string()))
            }
        }
    }
}

/// BLAKE3 of a whole file, hex encoded.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let file =
        File::open(path).map_err(|error| format!("Failed to read {}: {error}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|error| format!("Failed to hash {}: {error}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_string())
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_string()
}

fn temp_path_for(file_path: &Path) -> Result<PathBuf, String> {
    let file_name = file_path
        .file_name()
        .ok_or_else(|| format!("Invalid file path: {}", file_path.display()))?
        .to_string_lossy();
    Ok(file_path.with_file_name(format!("{}.tmp", file_name)))
}

/// Write through a sibling `.tmp` file and rename over the target.
pub fn write_atomic(file_path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent: {e}"))?;
    }
    let temp_path = temp_path_for(file_path)?;
    fs::write(&temp_path, bytes).map_err(|e| format!("Failed to write temp file: {e}"))?;

    match fs::rename(&temp_path, file_path) {
        Ok(_) => Ok(()),
        Err(_) => {
            if file_path.exists() {
                fs::remove_file(file_path)
                    .map_err(|e| format!("Failed to replace target file: {e}"))?;
            }
            fs::rename(&temp_path, file_path).map_err(|e| format!("Failed to finalize write: {e}"))
        }
    }
}

/// Read and parse a JSON file. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

/// Pretty-print `value` as JSON and write it atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize {}: {e}", path.display()))?;
    write_atomic(path, json.as_bytes())
}

/// Every regular file below `root`, as paths relative to `root`, sorted by name.
pub fn list_files_recursive(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

/// Remove a file or a directory tree.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
