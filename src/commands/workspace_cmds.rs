use super::context::Context;
use crate::services::workspace::mods::list_mods;
use crate::services::workspace::prune::prune_trackers;
use crate::services::workspace::trackers::{
    BinaryPatchRecord, CorePatchRecord, MigrationRecord, ScriptRecord, Tracker,
};
use crate::services::workspace::{
    BINARY_PATCHES_TRACKER, CORE_PATCHES_TRACKER, MIGRATIONS_TRACKER, SCRIPTS_TRACKER,
};
use crate::services::composer::resolve_build_order;

pub fn init(ctx: &Context) -> anyhow::Result<()> {
    let created = ctx.workspace.init()?;
    if created {
        println!("Initialized workspace at {}", ctx.workspace.root().display());
    } else {
        println!("Workspace already exists at {}", ctx.workspace.root().display());
    }
    println!("Config: {}", ctx.workspace.config_path().display());
    Ok(())
}

pub fn status(ctx: &Context) -> anyhow::Result<()> {
    let workspace = &ctx.workspace;
    workspace.require_initialized()?;
    println!("Workspace: {}", workspace.root().display());

    let manifest = workspace.read_manifest()?;
    match &manifest {
        Some(m) => {
            println!(
                "Baseline: {} ({}), extracted {}",
                m.client_data_path.display(),
                m.locale,
                m.extracted_at
            );
            println!("Archive chain: {}", m.archive_chain.join(", "));
            if !m.raw_only.is_empty() {
                println!("Raw-only tables: {}", m.raw_only.join(", "));
            }
        }
        None => println!("Baseline: not extracted"),
    }

    let mods = list_mods(workspace)?;
    let explicit = manifest.map(|m| m.build_order).unwrap_or_default();
    let order = resolve_build_order(&explicit, &mods);
    println!("Mods ({}), in build order:", order.len());
    for meta in &order {
        println!(
            "  [{}] {}{}",
            meta.slot.as_deref().unwrap_or("-"),
            meta.name,
            meta.description
                .as_deref()
                .map(|d| format!(": {d}"))
                .unwrap_or_default()
        );
    }

    let migrations = Tracker::<MigrationRecord>::load(&workspace.tracker_path(MIGRATIONS_TRACKER))?;
    let patches = Tracker::<BinaryPatchRecord>::load(&workspace.tracker_path(BINARY_PATCHES_TRACKER))?;
    let core = Tracker::<CorePatchRecord>::load(&workspace.tracker_path(CORE_PATCHES_TRACKER))?;
    let scripts = Tracker::<ScriptRecord>::load(&workspace.tracker_path(SCRIPTS_TRACKER))?;
    println!(
        "Applied: {} migration(s), {} binary patch(es), {} core patch(es), {} script(s)",
        migrations.len(),
        patches.len(),
        core.len(),
        scripts.len()
    );
    Ok(())
}

pub fn prune(ctx: &Context) -> anyhow::Result<()> {
    let report = prune_trackers(&ctx.workspace)?;
    println!(
        "Pruned {} entr(ies): {} migration(s), {} binary patch(es), {} core patch(es), {} script(s)",
        report.total(),
        report.migrations,
        report.binary_patches,
        report.core_patches,
        report.scripts
    );
    Ok(())
}

pub fn clean(ctx: &Context, keep_mods: bool) -> anyhow::Result<()> {
    let report = ctx.workspace.clean(keep_mods)?;
    if !report.removed {
        println!("Nothing to clean at {}", ctx.workspace.root().display());
        return Ok(());
    }
    println!("Removed {}", ctx.workspace.root().display());
    if keep_mods {
        println!("Restored mods: {}", report.restored_mods.join(", "));
    }
    Ok(())
}
