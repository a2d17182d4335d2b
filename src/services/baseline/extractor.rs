//! Extract the effective view of the client archives into the baseline.

use super::load_order::{archive_chain, detect_locale};
use super::manifest::BaselineManifest;
use super::resolver::{resolve_effective_view, FileKind};
use crate::services::archive::{ArchiveBackend, ArchiveReader};
use crate::services::dbc::{decode, registry};
use crate::services::fs_utils::file_utils::remove_path;
use crate::services::workspace::Workspace;
use crate::types::errors::{CommandError, CommandResult};
use std::fs;
use std::path::Path;

/// An item skipped without aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractIssue {
    ArchiveOpen { archive: String, reason: String },
    ExtractFailed { path: String, reason: String },
    RawOnly { table: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub locale: String,
    pub archive_chain: Vec<String>,
    pub dbc_files: usize,
    pub addon_files: usize,
    pub issues: Vec<ExtractIssue>,
}

pub fn extract_baseline(
    workspace: &Workspace,
    client_data_path: &Path,
    locale: Option<&str>,
    backend: &dyn ArchiveBackend,
) -> CommandResult<ExtractReport> {
    workspace.require_initialized()?;
    if !client_data_path.is_dir() {
        return Err(CommandError::BadInput(format!(
            "Client data directory not found: {}",
            client_data_path.display()
        )));
    }

    let locale = match locale {
        Some(locale) => locale.to_string(),
        None => detect_locale(client_data_path).ok_or_else(|| {
            CommandError::BadInput(format!(
                "No locale directory found under {}",
                client_data_path.display()
            ))
        })?,
    };

    let chain = archive_chain(client_data_path, &locale);
    if chain.is_empty() {
        return Err(CommandError::NotInitialized(format!(
            "No archives found under {}",
            client_data_path.display()
        )));
    }
    log::info!("Locale {locale}, {} archive(s) in chain", chain.len());

    let mut report = ExtractReport {
        locale: locale.clone(),
        archive_chain: chain.iter().map(|a| a.name.clone()).collect(),
        ..Default::default()
    };

    // Unopenable archives keep their slot with an empty listing.
    let mut readers: Vec<Option<Box<dyn ArchiveReader>>> = Vec::with_capacity(chain.len());
    let mut listings = Vec::with_capacity(chain.len());
    for archive in &chain {
        let opened = backend
            .open(&archive.path)
            .and_then(|mut reader| reader.list().map(|entries| (reader, entries)));
        match opened {
            Ok((reader, entries)) => {
                readers.push(Some(reader));
                listings.push(entries);
            }
            Err(reason) => {
                log::warn!("Skipping archive {}: {reason}", archive.name);
                report.issues.push(ExtractIssue::ArchiveOpen {
                    archive: archive.name.clone(),
                    reason,
                });
                readers.push(None);
                listings.push(Vec::new());
            }
        }
    }

    let effective = resolve_effective_view(&listings);

    let dbc_dir = workspace.baseline_dbc_dir();
    let addons_dir = workspace.baseline_addons_dir();
    for dir in [&dbc_dir, &addons_dir] {
        if dir.exists() {
            remove_path(dir)?;
        }
        fs::create_dir_all(dir)?;
    }

    let mut raw_only = Vec::new();
    for file in &effective {
        let Some(reader) = readers[file.archive_index].as_mut() else {
            continue;
        };
        let out_path = match file.kind {
            FileKind::Dbc => dbc_dir.join(&file.relative_path),
            FileKind::Addon => addons_dir.join(&file.relative_path),
        };
        if let Err(reason) = reader.extract(&file.internal_path, &out_path) {
            log::warn!("Failed to extract {}: {reason}", file.internal_path);
            report.issues.push(ExtractIssue::ExtractFailed {
                path: file.internal_path.clone(),
                reason,
            });
            continue;
        }

        match file.kind {
            FileKind::Addon => report.addon_files += 1,
            FileKind::Dbc => {
                report.dbc_files += 1;
                let table = file.relative_path.to_string_lossy().to_string();
                if let Some(reason) = validate_table(&out_path, &table) {
                    log::warn!("{table} kept as raw only: {reason}");
                    raw_only.push(table.clone());
                    report.issues.push(ExtractIssue::RawOnly { table, reason });
                }
            }
        }
    }

    // Re-extraction refreshes the chain but never loses the user's order.
    let build_order = workspace
        .read_manifest()?
        .map(|previous| previous.build_order)
        .unwrap_or_default();

    let manifest = BaselineManifest {
        extracted_at: chrono::Utc::now().to_rfc3339(),
        client_data_path: client_data_path.to_path_buf(),
        locale,
        archive_chain: report.archive_chain.clone(),
        build_order,
        raw_only,
    };
    workspace.save_manifest(&manifest)?;

    log::info!(
        "Baseline extracted: {} table(s), {} interface file(s), {} issue(s)",
        report.dbc_files,
        report.addon_files,
        report.issues.len()
    );
    Ok(report)
}

/// Parse a table against its schema. Tables without a schema pass.
fn validate_table(path: &Path, table: &str) -> Option<String> {
    let schema = registry().get(table)?;
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return Some(e.to_string()),
    };
    decode(&bytes, schema).err().map(|e| e.to_string())
}
