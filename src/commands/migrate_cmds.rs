use super::context::Context;
use crate::services::migrations::runner::ProcessRunner;
use crate::services::migrations::{apply_migrations, migration_status, rollback_migration};

pub fn apply(ctx: &Context) -> anyhow::Result<()> {
    let mut runner = ProcessRunner::new(ctx.settings()?.sql_runner);
    let report = apply_migrations(&ctx.workspace, &ctx.build_order()?, &mut runner)?;
    for record in &report.applied {
        println!("Applied {}/{}/{}", record.mod_name, record.database, record.file);
    }
    println!(
        "{} applied, {} already applied",
        report.applied.len(),
        report.already_applied
    );
    Ok(())
}

pub fn rollback(ctx: &Context, mod_name: &str, file: Option<&str>, reapply: bool) -> anyhow::Result<()> {
    let mut runner = ProcessRunner::new(ctx.settings()?.sql_runner);
    let report = rollback_migration(&ctx.workspace, mod_name, file, reapply, &mut runner)?;
    println!(
        "Rolled back {}/{}/{}",
        report.rolled_back.mod_name, report.rolled_back.database, report.rolled_back.file
    );
    if let Some(record) = report.reapplied {
        println!("Re-applied {}/{}/{}", record.mod_name, record.database, record.file);
    }
    Ok(())
}

pub fn status(ctx: &Context) -> anyhow::Result<()> {
    ctx.workspace.require_initialized()?;
    let entries = migration_status(&ctx.workspace, &ctx.build_order()?)?;
    if entries.is_empty() {
        println!("No migrations");
    }
    for entry in entries {
        let m = &entry.migration;
        println!(
            "{:<10} {}/{}/{}",
            entry.applied_at.as_deref().map_or("pending", |_| "applied"),
            m.mod_name,
            m.database,
            m.file
        );
    }
    Ok(())
}
