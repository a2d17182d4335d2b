use crate::services::csv_bridge::{csv_file_to_dbc, dbc_file_to_csv};
use crate::services::dbc::registry;
use anyhow::Context as _;
use std::path::Path;

pub fn to_csv(input: &Path, output: &Path, table: Option<&str>) -> anyhow::Result<()> {
    let name = match table {
        Some(table) => table.to_string(),
        None => input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .context("Input has no file name; pass --table")?,
    };
    let schema = registry()
        .get(&name)
        .with_context(|| format!("No schema for '{name}'"))?;
    let rows = dbc_file_to_csv(input, output, schema)?;
    println!("Wrote {} ({rows} row(s))", output.display());
    Ok(())
}

pub fn from_csv(input: &Path, output: &Path, table: &str) -> anyhow::Result<()> {
    let schema = registry()
        .get(table)
        .with_context(|| format!("No schema for '{table}'"))?;
    let rows = csv_file_to_dbc(input, output, schema)?;
    println!("Wrote {} ({rows} row(s))", output.display());
    Ok(())
}
