//! Load tabular files into the relational store and export them back.

use super::checksum_repo::{
    ensure_checksum_table, is_modified, live_checksum, set_baseline_checksum, set_source_hash,
    source_hash, table_exists,
};
use crate::services::fs_utils::file_utils::hash_file;
use super::ddl::{create_table_sql, quote_ident, unique_index_sql, KeyStrategy};
use crate::services::dbc::schema::LOC_TEXT_SLOTS;
use crate::services::dbc::string_heap::read_string;
use crate::services::dbc::{
    locate_table_file, read_dbc, registry, write_dbc, Column, ColumnKind, DbcFile, DbcRecord,
    DbcSchema, FieldType, FieldValue, StringHeapBuilder,
};
use crate::types::errors::{CommandError, CommandResult};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashSet;
use std::path::Path;

/// Bound parameters per INSERT; below SQLite's variable limit.
pub const MAX_PARAMS_PER_STATEMENT: usize = 32_000;
pub const MAX_ROWS_PER_BATCH: usize = 2_000;

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Int(i64),
    Real(f64),
    Text(String),
}

#[derive(Debug, Default, Clone)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone)]
pub struct ExportReport {
    /// File names written, e.g. `Spell.dbc`.
    pub written: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

pub fn rows_per_batch(column_count: usize) -> usize {
    (MAX_PARAMS_PER_STATEMENT / column_count.max(1)).clamp(1, MAX_ROWS_PER_BATCH)
}

/// NaN, infinities and subnormals do not survive the decimal column; they
/// are stored as zero.
fn sanitize_float(value: f32) -> f64 {
    if value.is_finite() && !value.is_subnormal() {
        value as f64
    } else {
        0.0
    }
}

fn cell(column: &Column, record: &DbcRecord, heap: &[u8]) -> Cell {
    match (column.kind, record.values.get(column.element)) {
        (_, Some(FieldValue::Int32(v))) => Cell::Int(*v as i64),
        (_, Some(FieldValue::UInt32(v))) => Cell::Int(*v as i64),
        (_, Some(FieldValue::UInt8(v))) => Cell::Int(*v as i64),
        (_, Some(FieldValue::Float(v))) => Cell::Real(sanitize_float(*v)),
        (_, Some(FieldValue::StringRef(offset))) => {
            Cell::Text(read_string(heap, *offset).into_owned())
        }
        (ColumnKind::LocText(slot), Some(FieldValue::Loc(offsets))) => {
            Cell::Text(read_string(heap, offsets[slot]).into_owned())
        }
        (ColumnKind::LocFlags, Some(FieldValue::Loc(offsets))) => {
            Cell::Int(offsets[LOC_TEXT_SLOTS] as i64)
        }
        _ => Cell::Int(0),
    }
}

/// Declared primary key when every key column exists and the data has no
/// duplicate keys; a synthetic row id otherwise.
fn choose_key(schema: &DbcSchema, columns: &[Column], file: &DbcFile) -> KeyStrategy {
    if schema.primary_keys.is_empty() {
        return KeyStrategy::Synthetic;
    }
    let key_columns: Option<Vec<&Column>> = schema
        .primary_keys
        .iter()
        .map(|key| columns.iter().find(|c| &c.name == key))
        .collect();
    let Some(key_columns) = key_columns else {
        log::warn!(
            "{}: primary key {:?} not in schema, using synthetic key",
            schema.file,
            schema.primary_keys
        );
        return KeyStrategy::Synthetic;
    };

    let mut seen = HashSet::with_capacity(file.records.len());
    for record in &file.records {
        let key: Vec<String> = key_columns
            .iter()
            .map(|c| format!("{:?}", cell(c, record, &file.string_block)))
            .collect();
        if !seen.insert(key) {
            log::warn!(
                "{}: duplicate primary key values, using synthetic key",
                schema.file
            );
            return KeyStrategy::Synthetic;
        }
    }
    KeyStrategy::Declared(schema.primary_keys.clone())
}

/// Replace the table for `schema` with the records of `file` and record its
/// baseline checksum. The load runs in one transaction.
pub async fn import_table(
    pool: &SqlitePool,
    schema: &DbcSchema,
    file: &DbcFile,
) -> CommandResult<usize> {
    let table = schema.table_name();
    let columns = schema.columns();
    let key = choose_key(schema, &columns, file);

    let ddl_failed =
        |e: sqlx::Error| CommandError::ExternalFailure(format!("DDL for {table} failed: {e}"));

    let mut tx = pool.begin().await?;
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(&table)))
        .execute(&mut *tx)
        .await
        .map_err(ddl_failed)?;
    sqlx::query(&create_table_sql(&table, &columns, &key))
        .execute(&mut *tx)
        .await
        .map_err(ddl_failed)?;

    let column_list = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let heap = &file.string_block;
    for chunk in file.records.chunks(rows_per_batch(columns.len())) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} ({column_list}) ",
            quote_ident(&table)
        ));
        qb.push_values(chunk, |mut row, record| {
            for column in &columns {
                match cell(column, record, heap) {
                    Cell::Int(v) => row.push_bind(v),
                    Cell::Real(v) => row.push_bind(v),
                    Cell::Text(v) => row.push_bind(v),
                };
            }
        });
        qb.build().execute(&mut *tx).await.map_err(|e| {
            CommandError::ExternalFailure(format!("Batch insert into {table} failed: {e}"))
        })?;
    }
    tx.commit().await?;

    for (index, fields) in schema.unique_keys.iter().enumerate() {
        if let Err(e) = sqlx::query(&unique_index_sql(&table, index, fields))
            .execute(pool)
            .await
        {
            log::warn!("{table}: unique key {fields:?} not enforced: {e}");
        }
    }

    ensure_checksum_table(pool).await?;
    let checksum = live_checksum(pool, &table).await?;
    set_baseline_checksum(pool, &table, &checksum).await?;

    log::info!("Imported {} row(s) into {table}", file.records.len());
    Ok(file.records.len())
}

fn select_expr(column: &Column) -> String {
    let name = quote_ident(&column.name);
    match column.kind {
        ColumnKind::Int32 | ColumnKind::UInt32 | ColumnKind::UInt8 | ColumnKind::LocFlags => {
            format!("COALESCE(CAST({name} AS INTEGER), 0)")
        }
        ColumnKind::Float => format!("COALESCE(CAST({name} AS REAL), 0.0)"),
        ColumnKind::Text | ColumnKind::LocText(_) => format!("COALESCE(CAST({name} AS TEXT), '')"),
    }
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

/// Rebuild a tabular file from the live table, ordered by the schema's sort
/// order (rowid when it has none), with a freshly interned string heap.
pub async fn export_table(pool: &SqlitePool, schema: &DbcSchema) -> CommandResult<DbcFile> {
    let table = schema.table_name();
    let columns = schema.columns();
    let elements = schema.elements();

    let select: Vec<String> = columns.iter().map(select_expr).collect();
    let order = if schema.sort_order.is_empty() {
        "rowid".to_string()
    } else {
        schema
            .sort_order
            .iter()
            .map(|s| format!("{} {}", quote_ident(&s.field), s.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {order}",
        select.join(", "),
        quote_ident(&table)
    );

    let query_failed =
        |e: sqlx::Error| CommandError::ExternalFailure(format!("Export query on {table} failed: {e}"));
    let rows = sqlx::query(&sql).fetch_all(pool).await.map_err(query_failed)?;

    let mut heap = StringHeapBuilder::new();
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values: Vec<FieldValue> =
            elements.iter().map(|e| empty_value(e.field_type)).collect();
        for (index, column) in columns.iter().enumerate() {
            let slot = &mut values[column.element];
            match column.kind {
                ColumnKind::Int32 => {
                    *slot = FieldValue::Int32(row.try_get::<i64, _>(index).map_err(query_failed)? as i32)
                }
                ColumnKind::UInt32 => {
                    *slot = FieldValue::UInt32(row.try_get::<i64, _>(index).map_err(query_failed)? as u32)
                }
                ColumnKind::UInt8 => {
                    *slot = FieldValue::UInt8(row.try_get::<i64, _>(index).map_err(query_failed)? as u8)
                }
                ColumnKind::Float => {
                    *slot = FieldValue::Float(row.try_get::<f64, _>(index).map_err(query_failed)? as f32)
                }
                ColumnKind::Text => {
                    let text: String = row.try_get(index).map_err(query_failed)?;
                    *slot = FieldValue::StringRef(heap.intern_str(&text));
                }
                ColumnKind::LocText(loc) => {
                    let text: String = row.try_get(index).map_err(query_failed)?;
                    if let FieldValue::Loc(offsets) = slot {
                        offsets[loc] = heap.intern_str(&text);
                    }
                }
                ColumnKind::LocFlags => {
                    let flags: i64 = row.try_get(index).map_err(query_failed)?;
                    if let FieldValue::Loc(offsets) = slot {
                        offsets[LOC_TEXT_SLOTS] = flags as u32;
                    }
                }
            }
        }
        records.push(DbcRecord { values });
    }

    Ok(DbcFile::new(schema, records, heap.into_bytes()))
}

/// Files (e.g. `Spell.dbc`) whose live table differs from its baseline.
pub async fn modified_tables(pool: &SqlitePool) -> CommandResult<Vec<String>> {
    ensure_checksum_table(pool).await?;
    let mut modified = Vec::new();
    for schema in registry().iter() {
        let table = schema.table_name();
        if table_exists(pool, &table).await? && is_modified(pool, &table).await? {
            modified.push(schema.file.clone());
        }
    }
    Ok(modified)
}

/// Export every modified table into `out_dir`. A failing table is skipped.
pub async fn export_modified(pool: &SqlitePool, out_dir: &Path) -> CommandResult<ExportReport> {
    let mut report = ExportReport::default();
    for file_name in modified_tables(pool).await? {
        let Some(schema) = registry().get(&file_name) else {
            continue;
        };
        match export_table(pool, schema).await {
            Ok(file) => {
                write_dbc(&out_dir.join(&schema.file), &file, schema)?;
                log::info!("Exported {} ({} rows)", schema.file, file.records.len());
                report.written.push(schema.file.clone());
            }
            Err(e) => {
                log::warn!("Skipping export of {}: {e}", schema.file);
                report.skipped.push((schema.file.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Import baseline tables into the store. With `only_stale`, a table is left
/// alone when it exists, still matches its baseline checksum and was loaded
/// from the same baseline file that is on disk now.
pub async fn import_baseline(
    pool: &SqlitePool,
    dbc_dir: &Path,
    only_stale: bool,
) -> CommandResult<ImportReport> {
    ensure_checksum_table(pool).await?;
    let mut report = ImportReport::default();
    for schema in registry().iter() {
        let Some(path) = locate_table_file(dbc_dir, &schema.file) else {
            continue;
        };
        let table = schema.table_name();
        let file_hash = match hash_file(&path) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("Skipping import of {}: {e}", schema.file);
                report.skipped.push((schema.file.clone(), e));
                continue;
            }
        };
        if only_stale && is_current(pool, &table, &file_hash).await? {
            continue;
        }

        let loaded = match read_dbc(&path, schema) {
            Ok(file) => import_table(pool, schema, &file).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(_) => {
                set_source_hash(pool, &table, &file_hash).await?;
                report.imported.push(schema.file.clone());
            }
            Err(e) => {
                log::warn!("Skipping import of {}: {e}", schema.file);
                report.skipped.push((schema.file.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}

async fn is_current(pool: &SqlitePool, table: &str, file_hash: &str) -> CommandResult<bool> {
    if !table_exists(pool, table).await? {
        return Ok(false);
    }
    if source_hash(pool, table).await?.as_deref() != Some(file_hash) {
        log::info!("{table}: baseline file changed since last import");
        return Ok(false);
    }
    Ok(!is_modified(pool, table).await?)
}
