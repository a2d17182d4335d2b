use super::context::Context;
use crate::services::patcher::ExePatcher;
use crate::services::workspace::mods::require_mod;
use anyhow::Context as _;
use std::path::PathBuf;

fn exe_path(ctx: &Context) -> anyhow::Result<(PathBuf, String)> {
    let settings = ctx.settings()?;
    let exe = settings
        .resolved_exe_path()
        .context("No executable; set exePath or clientDataPath in config.json")?;
    Ok((exe, settings.expected_exe_md5))
}

pub fn apply(ctx: &Context, mod_name: Option<&str>) -> anyhow::Result<()> {
    let (exe, md5) = exe_path(ctx)?;
    let mods = match mod_name {
        Some(name) => vec![require_mod(&ctx.workspace, name)?],
        None => ctx.build_order()?,
    };

    let patcher = ExePatcher::new(&ctx.workspace, exe, &md5);
    let report = patcher.apply(&mods)?;
    println!(
        "Patched {}: {} re-applied, {} new",
        patcher.exe_path().display(),
        report.reapplied.len(),
        report.applied.len()
    );
    for name in &report.applied {
        println!("  + {name}");
    }
    for name in &report.overlays_deployed {
        println!("  deployed {name}");
    }
    for name in &report.missing {
        println!("  missing {name} (run `mithril workspace prune`)");
    }
    Ok(())
}

pub fn restore(ctx: &Context) -> anyhow::Result<()> {
    let (exe, md5) = exe_path(ctx)?;
    let patcher = ExePatcher::new(&ctx.workspace, exe, &md5);
    let cleared = patcher.restore()?;
    println!(
        "Restored {} and cleared {cleared} tracked patch(es)",
        patcher.exe_path().display()
    );
    Ok(())
}

pub fn status(ctx: &Context) -> anyhow::Result<()> {
    let (exe, md5) = exe_path(ctx)?;
    let status = ExePatcher::new(&ctx.workspace, exe, &md5).status()?;
    println!("Executable: {}", status.exe_path.display());
    match &status.backup {
        Some(backup) => println!(
            "Backup MD5: {}{}",
            backup.md5,
            if backup.known_good { " (supported client)" } else { " (unrecognized build)" }
        ),
        None => println!("Backup: none"),
    }
    for record in &status.tracked {
        println!("  {:?} {} at {}", record.kind, record.name, record.applied_at);
    }
    Ok(())
}
