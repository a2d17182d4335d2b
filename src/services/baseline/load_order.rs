//! Archive load order for a 3.3.5a client data directory.

use std::fs;
use std::path::{Path, PathBuf};

/// Locale directory names, in lookup order.
pub const KNOWN_LOCALES: [&str; 12] = [
    "enUS", "enGB", "deDE", "frFR", "esES", "esMX", "ruRU", "koKR", "zhCN", "zhTW", "ptBR",
    "itIT",
];

/// One link in the chain, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainEntry {
    Root(&'static str),
    /// `{}` is replaced by the locale; lives under `Data/<locale>/`.
    Locale(&'static str),
}

const CHAIN: [ChainEntry; 13] = [
    ChainEntry::Locale("expansion-locale-{}"),
    ChainEntry::Locale("locale-{}"),
    ChainEntry::Root("expansion"),
    ChainEntry::Locale("lichking-locale-{}"),
    ChainEntry::Root("common"),
    ChainEntry::Root("lichking"),
    ChainEntry::Root("common-2"),
    ChainEntry::Locale("patch-{}"),
    ChainEntry::Root("patch"),
    ChainEntry::Locale("patch-{}-2"),
    ChainEntry::Root("patch-2"),
    ChainEntry::Locale("patch-{}-3"),
    ChainEntry::Root("patch-3"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainArchive {
    /// Path relative to the data root, `/`-separated (e.g. `enUS/patch-enUS-2.MPQ`).
    pub name: String,
    pub path: PathBuf,
}

/// First known locale with a subdirectory under `data_root`.
pub fn detect_locale(data_root: &Path) -> Option<String> {
    KNOWN_LOCALES
        .iter()
        .find(|locale| data_root.join(locale).is_dir())
        .map(|locale| locale.to_string())
}

/// Existing archives of the chain, in ascending priority.
pub fn archive_chain(data_root: &Path, locale: &str) -> Vec<ChainArchive> {
    CHAIN
        .iter()
        .filter_map(|entry| {
            let (dir, rel_dir, stem) = match entry {
                ChainEntry::Root(stem) => (data_root.to_path_buf(), None, stem.to_string()),
                ChainEntry::Locale(pattern) => (
                    data_root.join(locale),
                    Some(locale),
                    pattern.replace("{}", locale),
                ),
            };
            let file_name = find_archive(&dir, &stem)?;
            let name = match rel_dir {
                Some(sub) => format!("{sub}/{file_name}"),
                None => file_name.clone(),
            };
            Some(ChainArchive {
                name,
                path: dir.join(file_name),
            })
        })
        .collect()
}

/// `<stem>.MPQ` in `dir`, matched case-insensitively.
fn find_archive(dir: &Path, stem: &str) -> Option<String> {
    let wanted = format!("{stem}.mpq");
    let exact = format!("{stem}.MPQ");
    if dir.join(&exact).exists() {
        return Some(exact);
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.to_lowercase() == wanted)
        .collect();
    names.sort();
    names.into_iter().next()
}
