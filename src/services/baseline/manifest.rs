use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `modules/baseline/manifest.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BaselineManifest {
    pub extracted_at: String,
    pub client_data_path: PathBuf,
    pub locale: String,
    /// Source archives, lowest priority first, relative to the data root.
    pub archive_chain: Vec<String>,
    /// User-edited mod precedence; later entries win.
    #[serde(default)]
    pub build_order: Vec<String>,
    /// Tables that were extracted but failed to parse against their schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_only: Vec<String>,
}
