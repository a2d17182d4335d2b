use super::context::Context;
use crate::services::csv_bridge::{dbc_file_to_csv, CSV_SUFFIX};
use crate::services::dbc::{locate_table_file, registry};
use crate::services::workspace::mods::{
    create_mod, list_mods, remove_mod, require_mod, set_build_order,
};
use anyhow::{bail, Context as _};

pub fn create(ctx: &Context, name: &str, description: Option<String>) -> anyhow::Result<()> {
    ctx.workspace.require_initialized()?;
    let meta = create_mod(&ctx.workspace, name, description)?;
    println!("Created mod '{}' at {}", meta.name, ctx.workspace.mod_dir(&meta.name).display());
    Ok(())
}

pub fn list(ctx: &Context) -> anyhow::Result<()> {
    let mods = list_mods(&ctx.workspace)?;
    if mods.is_empty() {
        println!("No mods");
    }
    for meta in mods {
        println!(
            "{:<4} {:<24} {}",
            meta.slot.as_deref().unwrap_or("-"),
            meta.name,
            meta.description.unwrap_or_default()
        );
    }
    Ok(())
}

pub fn remove(ctx: &Context, name: &str) -> anyhow::Result<()> {
    remove_mod(&ctx.workspace, name)?;
    println!("Removed mod '{name}'");
    Ok(())
}

pub fn order_show(ctx: &Context) -> anyhow::Result<()> {
    let explicit = ctx
        .workspace
        .read_manifest()?
        .map(|m| m.build_order)
        .unwrap_or_default();
    let order = ctx.build_order()?;
    for (index, meta) in order.iter().enumerate() {
        let marker = if explicit.contains(&meta.name) { "" } else { " (appended)" };
        println!("{}. {}{marker}", index + 1, meta.name);
    }
    Ok(())
}

pub fn order_set(ctx: &Context, names: &[String]) -> anyhow::Result<()> {
    set_build_order(&ctx.workspace, names)?;
    println!("Build order: {}", names.join(" < "));
    Ok(())
}

/// Seed a CSV table override from the baseline.
pub fn edit_table(ctx: &Context, mod_name: &str, table: &str) -> anyhow::Result<()> {
    ctx.workspace.load_manifest()?;
    require_mod(&ctx.workspace, mod_name)?;
    let schema = registry()
        .get(table)
        .with_context(|| format!("No schema for table '{table}'"))?;
    let source = locate_table_file(&ctx.workspace.baseline_dbc_dir(), &schema.file)
        .with_context(|| format!("{} is not in the baseline", schema.file))?;

    let stem = schema.file.trim_end_matches(".dbc");
    let dest = ctx
        .workspace
        .mod_dir(mod_name)
        .join("dbc")
        .join(format!("{stem}{CSV_SUFFIX}"));
    if dest.exists() {
        bail!("{} already exists", dest.display());
    }
    let rows = dbc_file_to_csv(&source, &dest, schema)?;
    println!("Wrote {} ({rows} row(s))", dest.display());
    Ok(())
}
