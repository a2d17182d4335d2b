//! Effective view over an archive chain.

use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::services::archive::internal_to_relative;

static DBC_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^DBFilesClient\\([^\\]+)\.dbc$").expect("valid dbc entry regex")
});
static ADDON_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Interface\\(.+\.(?:lua|xml|toc))$").expect("valid addon entry regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileKind {
    Dbc,
    Addon,
}

/// A logical file and the archive that supplies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveFile {
    pub kind: FileKind,
    /// Index into the chain (ascending priority).
    pub archive_index: usize,
    /// Entry name exactly as listed by the archive.
    pub internal_path: String,
    /// Destination below the baseline's `dbc/` or `addons/`.
    pub relative_path: PathBuf,
}

impl EffectiveFile {
    fn key(&self) -> (FileKind, String) {
        (
            self.kind,
            self.relative_path.to_string_lossy().replace('\\', "/").to_lowercase(),
        )
    }
}

/// `spell` → `Spell`.
pub fn capitalize_stem(stem: &str) -> String {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Classify an archive entry. `None` for files outside the selection set.
pub fn classify_entry(internal_path: &str) -> Option<(FileKind, PathBuf)> {
    let normalized = internal_path.replace('/', "\\");
    if let Some(caps) = DBC_ENTRY_RE.captures(&normalized) {
        let name = format!("{}.dbc", capitalize_stem(&caps[1]));
        return Some((FileKind::Dbc, PathBuf::from(name)));
    }
    if let Some(caps) = ADDON_ENTRY_RE.captures(&normalized) {
        return Some((FileKind::Addon, internal_to_relative(&caps[1])));
    }
    None
}

/// Resolve the effective view. `listings[i]` holds the entries of chain
/// archive `i`; archives later in the slice take priority. The result is
/// sorted by kind then path so extraction order is stable.
pub fn resolve_effective_view(listings: &[Vec<String>]) -> Vec<EffectiveFile> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for (archive_index, entries) in listings.iter().enumerate().rev() {
        for internal_path in entries {
            let Some((kind, relative_path)) = classify_entry(internal_path) else {
                continue;
            };
            let file = EffectiveFile {
                kind,
                archive_index,
                internal_path: internal_path.clone(),
                relative_path,
            };
            if seen.insert(file.key()) {
                files.push(file);
            }
        }
    }

    files.sort_by_key(|file| file.key());
    files
}
