//! Archive slots: `A`..`L`, then `AA`..`LL`. `M` names the all-mods build.

use crate::services::workspace::mods::{write_mod_meta, ModMeta};
use crate::services::workspace::Workspace;
use crate::types::errors::{CommandError, CommandResult};
use std::collections::HashSet;

pub const ALL_MODS_SLOT: &str = "M";
const SLOT_LETTERS: std::ops::RangeInclusive<char> = 'A'..='L';

/// Every assignable slot in assignment order.
pub fn all_slots() -> Vec<String> {
    let singles = SLOT_LETTERS.map(String::from);
    let doubles = SLOT_LETTERS.flat_map(|a| SLOT_LETTERS.map(move |b| format!("{a}{b}")));
    singles.chain(doubles).collect()
}

pub fn is_valid_slot(slot: &str) -> bool {
    (1..=2).contains(&slot.len()) && slot.chars().all(|c| SLOT_LETTERS.contains(&c))
}

/// Give every mod without a usable slot the next free one and persist it.
/// Mods that already hold a unique valid slot keep it, so repeated calls
/// change nothing.
pub fn assign_slots(workspace: &Workspace, mods: &mut [ModMeta]) -> CommandResult<usize> {
    let mut taken = HashSet::new();
    let mut needs_slot = Vec::new();
    for (index, meta) in mods.iter().enumerate() {
        match meta.slot.as_deref() {
            Some(slot) if is_valid_slot(slot) && taken.insert(slot.to_string()) => {}
            Some(slot) => {
                log::warn!("Mod '{}' has unusable slot '{slot}', reassigning", meta.name);
                needs_slot.push(index);
            }
            None => needs_slot.push(index),
        }
    }

    let mut free = all_slots().into_iter().filter(|s| !taken.contains(s));
    for index in &needs_slot {
        let meta = &mut mods[*index];
        let slot = free.next().ok_or_else(|| {
            CommandError::Conflict(format!("No free archive slot left for mod '{}'", meta.name))
        })?;
        log::info!("Assigned slot {slot} to mod '{}'", meta.name);
        meta.slot = Some(slot);
        write_mod_meta(&workspace.mod_dir(&meta.name), meta)?;
    }
    Ok(needs_slot.len())
}
