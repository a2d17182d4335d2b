//! Append-mostly JSON trackers, one file per concern.

use crate::services::fs_utils::file_utils::{read_json, write_json};
use crate::types::errors::{CommandError, CommandResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An applied migration. Keyed by `(mod, database, file)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    #[serde(rename = "mod")]
    pub mod_name: String,
    pub file: String,
    pub database: String,
    pub applied_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BinaryPatchKind {
    Descriptor,
    Overlay,
}

/// An applied patch descriptor or deployed native overlay.
/// `name` has the form `<mod>/binary-patches/<file>`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BinaryPatchRecord {
    pub name: String,
    pub kind: BinaryPatchKind,
    pub applied_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// A native-source diff applied to the server checkout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorePatchRecord {
    #[serde(rename = "mod")]
    pub mod_name: String,
    pub file: String,
    pub applied_at: String,
}

/// A native script deployed into the server checkout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    #[serde(rename = "mod")]
    pub mod_name: String,
    pub file: String,
    pub checksum: String,
}

pub struct Tracker<T> {
    path: PathBuf,
    entries: Vec<T>,
}

impl<T: Serialize + DeserializeOwned> Tracker<T> {
    /// Load the tracker; a missing file is an empty tracker.
    pub fn load(path: &Path) -> CommandResult<Self> {
        let entries = read_json::<Vec<T>>(path)
            .map_err(CommandError::Inconsistent)?
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.entries.iter().any(pred)
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    /// Keep entries matching `keep`; returns the removed ones in order.
    pub fn retain(&mut self, keep: impl Fn(&T) -> bool) -> Vec<T> {
        let (kept, removed): (Vec<T>, Vec<T>) =
            std::mem::take(&mut self.entries).into_iter().partition(|e| keep(e));
        self.entries = kept;
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self) -> CommandResult<()> {
        write_json(&self.path, &self.entries).map_err(CommandError::Io)
    }
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
