pub mod models;

pub use models::*;

use crate::services::fs_utils::file_utils::{read_json, write_json};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed settings. A missing file yields defaults; saves are atomic.
pub struct ConfigService {
    path: PathBuf,
    settings: Mutex<AppSettings>,
}

impl ConfigService {
    pub fn load(path: &Path) -> Result<Self, String> {
        let settings = read_json::<AppSettings>(path)?.unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            settings: Mutex::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_settings(&self) -> AppSettings {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save_settings(&self, new_settings: AppSettings) -> Result<(), String> {
        write_json(&self.path, &new_settings)?;
        *self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = new_settings;
        Ok(())
    }

    /// Write the current settings if the file does not exist yet.
    pub fn ensure_file(&self) -> Result<bool, String> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save_settings(self.get_settings())?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
