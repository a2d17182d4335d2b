//! Tabular binary (WDBC) codec and the embedded schema registry.

pub mod codec;
pub mod registry;
pub mod schema;
pub mod string_heap;

pub use codec::{decode, encode, DbcFile, DbcHeader, DbcRecord, FieldValue};
pub use registry::{normalize_table_key, registry, SchemaRegistry};
pub use schema::{Column, ColumnKind, DbcSchema, FieldDef, FieldType, SortDirection, SortKey};
pub use string_heap::StringHeapBuilder;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::errors::CommandResult;

#[derive(Debug, Error)]
pub enum DbcError {
    #[error("bad magic {0:?}, expected WDBC")]
    BadMagic([u8; 4]),
    #[error("truncated: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },
    #[error("schema mismatch for {schema}: expected {expected}, found {actual}")]
    SchemaMismatch {
        schema: String,
        expected: u32,
        actual: u32,
    },
    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),
}

/// Read and decode a DBC file from disk.
pub fn read_dbc(path: &Path, schema: &DbcSchema) -> CommandResult<DbcFile> {
    let bytes = fs::read(path)?;
    Ok(decode(&bytes, schema)?)
}

/// Encode and write a DBC file, creating parent directories as needed.
pub fn write_dbc(path: &Path, file: &DbcFile, schema: &DbcSchema) -> CommandResult<()> {
    let bytes = encode(file, schema)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Find the file for `table` in `dir`, ignoring case (`spellicon.dbc` and
/// `SpellIcon.dbc` both match `SpellIcon`).
pub fn locate_table_file(dir: &Path, table: &str) -> Option<PathBuf> {
    let exact = dir.join(table);
    if exact.is_file() {
        return Some(exact);
    }
    let wanted = normalize_table_key(table);
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase());
            name.is_some_and(|n| n.ends_with(".dbc") && normalize_table_key(&n) == wanted)
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}
