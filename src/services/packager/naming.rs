//! Patch archive names and recognition of the ones this tool produced.

use super::slots::ALL_MODS_SLOT;
use crate::services::baseline::load_order::KNOWN_LOCALES;
use regex::Regex;
use std::sync::LazyLock;

static PATCH_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^patch-(.+)\.mpq$").expect("valid patch name regex"));

/// Slot part of an archive name: `M` for a whole multi-mod workspace,
/// otherwise the selected slots sorted and joined with `-`.
pub fn selection_slots(selected: &[&str], whole_workspace: bool) -> String {
    if whole_workspace && selected.len() > 1 {
        return ALL_MODS_SLOT.to_string();
    }
    let mut slots: Vec<&str> = selected.to_vec();
    slots.sort_unstable();
    slots.dedup();
    slots.join("-")
}

pub fn tabular_archive_name(slots: &str) -> String {
    format!("patch-{slots}.MPQ")
}

pub fn locale_archive_name(locale: &str, slots: &str) -> String {
    format!("patch-{locale}-{slots}.MPQ")
}

/// `patch-[<locale>-]<SLOTS>.MPQ` where every slot segment is uppercase
/// ASCII letters. Base archives such as `patch-2.MPQ` never match.
pub fn is_system_patch(file_name: &str) -> bool {
    let Some(caps) = PATCH_NAME_RE.captures(file_name) else {
        return false;
    };
    let mut segments: Vec<&str> = caps[1].split('-').collect();
    if segments
        .first()
        .is_some_and(|first| KNOWN_LOCALES.contains(first))
    {
        segments.remove(0);
    }
    !segments.is_empty()
        && segments
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase()))
}
