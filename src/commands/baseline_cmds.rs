use super::context::Context;
use crate::database::dbc_repo::import_baseline;
use crate::services::baseline::{extract_baseline, ExtractIssue};
use anyhow::Context as _;
use std::path::PathBuf;

pub fn extract(ctx: &Context, client: Option<PathBuf>, locale: Option<String>) -> anyhow::Result<()> {
    let settings = ctx.settings()?;
    let data_dir = client
        .or_else(|| settings.client_data_path.clone())
        .context("No client data directory; pass --client or set clientDataPath in config.json")?;
    let backend = ctx.backend(&settings);

    let report = extract_baseline(&ctx.workspace, &data_dir, locale.as_deref(), backend.as_ref())?;
    println!(
        "Extracted {} table(s) and {} interface file(s) for {} from {} archive(s)",
        report.dbc_files,
        report.addon_files,
        report.locale,
        report.archive_chain.len()
    );
    for issue in &report.issues {
        match issue {
            ExtractIssue::ArchiveOpen { archive, reason } => {
                println!("  skipped archive {archive}: {reason}")
            }
            ExtractIssue::ExtractFailed { path, reason } => {
                println!("  skipped {path}: {reason}")
            }
            ExtractIssue::RawOnly { table, reason } => {
                println!("  raw only {table}: {reason}")
            }
        }
    }
    Ok(())
}

pub async fn import(ctx: &Context, force: bool) -> anyhow::Result<()> {
    ctx.workspace.load_manifest()?;
    let pool = ctx.open_store().await?;
    let result = import_baseline(&pool, &ctx.workspace.baseline_dbc_dir(), !force).await;
    pool.close().await;

    let report = result?;
    println!("Imported {} table(s)", report.imported.len());
    for (file, reason) in &report.skipped {
        println!("  skipped {file}: {reason}");
    }
    Ok(())
}
