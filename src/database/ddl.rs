use crate::services::dbc::{Column, ColumnKind};

/// Synthetic key prepended when the declared primary key is unusable.
pub const ROW_ID_COLUMN: &str = "_row_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    Declared(Vec<String>),
    Synthetic,
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Declared column type. SQLite only keeps the affinity, but the names
/// document the value range the exporter expects.
pub fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int32 => "INT",
        ColumnKind::UInt32 | ColumnKind::LocFlags => "INT UNSIGNED",
        ColumnKind::UInt8 => "TINYINT UNSIGNED",
        ColumnKind::Float => "DECIMAL(20,9)",
        ColumnKind::Text | ColumnKind::LocText(_) => "TEXT",
    }
}

pub fn create_table_sql(table: &str, columns: &[Column], key: &KeyStrategy) -> String {
    let mut defs = Vec::with_capacity(columns.len() + 2);
    if *key == KeyStrategy::Synthetic {
        defs.push(format!("{} INTEGER PRIMARY KEY", quote_ident(ROW_ID_COLUMN)));
    }
    for column in columns {
        defs.push(format!(
            "{} {} NOT NULL",
            quote_ident(&column.name),
            sql_type(column.kind)
        ));
    }
    if let KeyStrategy::Declared(keys) = key {
        let keys: Vec<String> = keys.iter().map(|k| quote_ident(k)).collect();
        defs.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }
    format!("CREATE TABLE {} (\n  {}\n)", quote_ident(table), defs.join(",\n  "))
}

pub fn unique_index_sql(table: &str, index: usize, fields: &[String]) -> String {
    let cols: Vec<String> = fields.iter().map(|f| quote_ident(f)).collect();
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_ident(&format!("ux_{table}_{index}")),
        quote_ident(table),
        cols.join(", ")
    )
}

pub const CHECKSUM_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS dbc_checksum (
    table_name TEXT PRIMARY KEY,
    checksum TEXT NOT NULL,
    source_hash TEXT
)";
