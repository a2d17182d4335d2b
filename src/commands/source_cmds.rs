use super::context::Context;
use crate::services::source_overlays::apply_source_overlays;
use crate::services::source_overlays::differ::GitApply;
use anyhow::Context as _;

pub fn apply(ctx: &Context) -> anyhow::Result<()> {
    let settings = ctx.settings()?;
    let source_dir = settings
        .source_dir
        .clone()
        .context("No server source checkout; set sourceDir in config.json")?;
    let mods = ctx.build_order()?;

    let report = apply_source_overlays(
        &ctx.workspace,
        &source_dir,
        &settings.scripts_subdir,
        &mods,
        &mut GitApply,
    )?;
    for name in &report.core_patches_applied {
        println!("Applied {name}");
    }
    for name in &report.scripts_deployed {
        println!("Deployed {name}");
    }
    println!(
        "{} core patch(es) already applied, {} script(s) unchanged",
        report.core_patches_skipped, report.scripts_unchanged
    );
    Ok(())
}
