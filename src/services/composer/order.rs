use crate::services::workspace::mods::ModMeta;

/// Effective build order: the manifest's explicit order restricted to mods
/// on disk, then every remaining mod in directory order. Later mods win.
pub fn resolve_build_order(explicit: &[String], on_disk: &[ModMeta]) -> Vec<ModMeta> {
    let mut ordered: Vec<ModMeta> = Vec::with_capacity(on_disk.len());
    for name in explicit {
        if ordered.iter().any(|m| &m.name == name) {
            continue;
        }
        match on_disk.iter().find(|m| &m.name == name) {
            Some(meta) => ordered.push(meta.clone()),
            None => log::warn!("Build order lists '{name}', which is not on disk"),
        }
    }
    for meta in on_disk {
        if !ordered.iter().any(|m| m.name == meta.name) {
            ordered.push(meta.clone());
        }
    }
    ordered
}
