//! Text round-trip of tabular records through CSV.
//!
//! The header row is the expanded column list of the schema. Floats use the
//! shortest decimal that round-trips; `Loc` fields become 16 text columns
//! plus the flags integer.

use crate::services::dbc::schema::LOC_TEXT_SLOTS;
use crate::services::dbc::string_heap::read_string;
use crate::services::dbc::{
    locate_table_file, read_dbc, write_dbc, Column, ColumnKind, DbcFile, DbcRecord, DbcSchema,
    FieldType, FieldValue, StringHeapBuilder,
};
use crate::services::fs_utils::file_utils::{hash_bytes, write_atomic};
use crate::types::errors::{CommandError, CommandResult};
use std::fs;
use std::path::Path;

/// Suffix of per-table CSV overrides inside a mod (`Spell.dbc.csv`).
pub const CSV_SUFFIX: &str = ".dbc.csv";

fn render_cell(column: &Column, record: &DbcRecord, heap: &[u8]) -> String {
    match (column.kind, record.values.get(column.element)) {
        (_, Some(FieldValue::Int32(v))) => v.to_string(),
        (_, Some(FieldValue::UInt32(v))) => v.to_string(),
        (_, Some(FieldValue::UInt8(v))) => v.to_string(),
        (_, Some(FieldValue::Float(v))) => v.to_string(),
        (_, Some(FieldValue::StringRef(offset))) => read_string(heap, *offset).into_owned(),
        (ColumnKind::LocText(slot), Some(FieldValue::Loc(offsets))) => {
            read_string(heap, offsets[slot]).into_owned()
        }
        (ColumnKind::LocFlags, Some(FieldValue::Loc(offsets))) => {
            offsets[LOC_TEXT_SLOTS].to_string()
        }
        _ => String::new(),
    }
}

/// Render a decoded file as CSV bytes.
pub fn to_csv(file: &DbcFile, schema: &DbcSchema) -> CommandResult<Vec<u8>> {
    let columns = schema.columns();
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_failed = |e: csv::Error| CommandError::Io(format!("Failed to write CSV: {e}"));

    writer
        .write_record(columns.iter().map(|c| c.name.as_str()))
        .map_err(csv_failed)?;
    for record in &file.records {
        writer
            .write_record(
                columns
                    .iter()
                    .map(|c| render_cell(c, record, &file.string_block)),
            )
            .map_err(csv_failed)?;
    }
    writer
        .into_inner()
        .map_err(|e| CommandError::Io(format!("Failed to flush CSV: {e}")))
}

fn parse_number<T: std::str::FromStr>(raw: &str, row: usize, column: &Column) -> CommandResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        CommandError::BadInput(format!(
            "row {row}, column {}: '{raw}' is not a valid {:?} value: {e}",
            column.name, column.kind
        ))
    })
}

fn empty_value(field_type: FieldType) -> FieldValue {
    match field_type {
        FieldType::Int32 => FieldValue::Int32(0),
        FieldType::UInt32 => FieldValue::UInt32(0),
        FieldType::UInt8 => FieldValue::UInt8(0),
        FieldType::Float => FieldValue::Float(0.0),
        FieldType::String => FieldValue::StringRef(0),
        FieldType::Loc => FieldValue::Loc([0; 17]),
    }
}

/// Parse CSV bytes into a file with a freshly built string heap. The header
/// must equal the schema's column list.
pub fn from_csv(bytes: &[u8], schema: &DbcSchema) -> CommandResult<DbcFile> {
    let columns = schema.columns();
    let elements = schema.elements();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| CommandError::BadInput(format!("Unreadable CSV header: {e}")))?
        .clone();
    if headers.len() != columns.len() {
        return Err(CommandError::BadInput(format!(
            "{}: CSV has {} columns, schema expects {}",
            schema.file,
            headers.len(),
            columns.len()
        )));
    }
    for (found, column) in headers.iter().zip(&columns) {
        if found != column.name {
            return Err(CommandError::BadInput(format!(
                "{}: CSV column '{found}' where '{}' was expected",
                schema.file, column.name
            )));
        }
    }

    let mut heap = StringHeapBuilder::new();
    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = row.map_err(|e| CommandError::BadInput(format!("row {line}: {e}")))?;
        if row.len() != columns.len() {
            return Err(CommandError::BadInput(format!(
                "row {line}: {} fields, expected {}",
                row.len(),
                columns.len()
            )));
        }

        let mut values: Vec<FieldValue> =
            elements.iter().map(|e| empty_value(e.field_type)).collect();
        for (raw, column) in row.iter().zip(&columns) {
            let slot = &mut values[column.element];
            match column.kind {
                ColumnKind::Int32 => *slot = FieldValue::Int32(parse_number(raw, line, column)?),
                ColumnKind::UInt32 => *slot = FieldValue::UInt32(parse_number(raw, line, column)?),
                ColumnKind::UInt8 => *slot = FieldValue::UInt8(parse_number(raw, line, column)?),
                ColumnKind::Float => *slot = FieldValue::Float(parse_number(raw, line, column)?),
                ColumnKind::Text => *slot = FieldValue::StringRef(heap.intern_str(raw)),
                ColumnKind::LocText(loc) => {
                    if let FieldValue::Loc(offsets) = slot {
                        offsets[loc] = heap.intern_str(raw);
                    }
                }
                ColumnKind::LocFlags => {
                    let flags: u32 = parse_number(raw, line, column)?;
                    if let FieldValue::Loc(offsets) = slot {
                        offsets[LOC_TEXT_SLOTS] = flags;
                    }
                }
            }
        }
        records.push(DbcRecord { values });
    }

    Ok(DbcFile::new(schema, records, heap.into_bytes()))
}

pub fn dbc_file_to_csv(dbc_path: &Path, csv_path: &Path, schema: &DbcSchema) -> CommandResult<usize> {
    let file = read_dbc(dbc_path, schema)?;
    let bytes = to_csv(&file, schema)?;
    write_atomic(csv_path, &bytes).map_err(CommandError::Io)?;
    Ok(file.records.len())
}

pub fn csv_file_to_dbc(csv_path: &Path, dbc_path: &Path, schema: &DbcSchema) -> CommandResult<usize> {
    let bytes = fs::read(csv_path)?;
    let file = from_csv(&bytes, schema)?;
    write_dbc(dbc_path, &file, schema)?;
    Ok(file.records.len())
}

/// Content hash of the CSV rendering of a baseline table, or `None` when the
/// baseline has no such table.
pub fn baseline_csv_hash(baseline_dbc_dir: &Path, schema: &DbcSchema) -> CommandResult<Option<String>> {
    let Some(path) = locate_table_file(baseline_dbc_dir, &schema.file) else {
        return Ok(None);
    };
    let file = read_dbc(&path, schema)?;
    Ok(Some(hash_bytes(&to_csv(&file, schema)?)))
}

/// Table name from an override file name (`Spell.dbc.csv` → `Spell`).
pub fn table_from_override(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(CSV_SUFFIX.len())?;
    let stem = file_name.get(..split)?;
    let suffix = file_name.get(split..)?;
    (!stem.is_empty() && suffix.eq_ignore_ascii_case(CSV_SUFFIX)).then_some(stem)
}

#[cfg(test)]
#[path = "tests/csv_bridge_tests.rs"]
mod tests;
