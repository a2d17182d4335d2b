use super::context::Context;
use crate::services::composer::{build, needs_relational_store, plan_build, BuildOptions};

pub async fn run(ctx: &Context, selection: &[String]) -> anyhow::Result<()> {
    let settings = ctx.settings()?;
    let backend = ctx.backend(&settings);
    let planned = plan_build(&ctx.workspace, selection)?;
    let pool = if needs_relational_store(&ctx.workspace, &planned)? {
        Some(ctx.open_store().await?)
    } else {
        None
    };

    let result = build(
        &ctx.workspace,
        BuildOptions {
            selection,
            backend: backend.as_ref(),
            pool: pool.as_ref(),
            data_dir: settings.client_data_path.clone(),
            server_dbc_dir: settings.server_dbc_path.clone(),
        },
    )
    .await;
    if let Some(pool) = pool {
        pool.close().await;
    }
    let report = result?;

    for removed in &report.removed_patches {
        println!("Removed {}", removed.display());
    }
    println!("Built {} as slot {}", report.mods.join(", "), report.slots);
    if let Some(path) = &report.tabular_archive {
        println!("  {} ({} table(s))", path.display(), report.dbc_files.len());
    }
    if let Some(path) = &report.locale_archive {
        println!("  {} ({} interface file(s))", path.display(), report.addon_files.len());
    }
    if report.server_tables > 0 {
        println!("  {} table(s) copied to the server", report.server_tables);
    }
    Ok(())
}
