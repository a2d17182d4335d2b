//! Table-level checksums and the `dbc_checksum` baseline sidecar.

use super::ddl::{quote_ident, CHECKSUM_TABLE_SQL};
use sqlx::{Row, SqlitePool};

pub async fn ensure_checksum_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CHECKSUM_TABLE_SQL).execute(pool).await?;
    // Stores created before source hashes were tracked.
    if !table_columns(pool, "dbc_checksum")
        .await?
        .iter()
        .any(|c| c == "source_hash")
    {
        sqlx::query("ALTER TABLE dbc_checksum ADD COLUMN source_hash TEXT")
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Live column names in declaration order.
pub async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

async fn key_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk")
            .bind(table)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Content digest of a table: BLAKE3 over every row rendered with `quote()`,
/// ordered by the table key (rowid when it has none).
pub async fn live_checksum(pool: &SqlitePool, table: &str) -> Result<String, sqlx::Error> {
    let columns = table_columns(pool, table).await?;
    let keys = key_columns(pool, table).await?;

    let select: Vec<String> = columns
        .iter()
        .map(|c| format!("quote({})", quote_ident(c)))
        .collect();
    let order = if keys.is_empty() {
        "rowid".to_string()
    } else {
        keys.iter().map(|k| quote_ident(k)).collect::<Vec<_>>().join(", ")
    };
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {order}",
        select.join(", "),
        quote_ident(table)
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(columns.join(",").as_bytes());
    for row in rows {
        hasher.update(b"\n");
        for index in 0..columns.len() {
            let cell: String = row.try_get(index)?;
            hasher.update(cell.as_bytes());
            hasher.update(b",");
        }
    }
    Ok(hasher.finalize().to_string())
}

pub async fn baseline_checksum(
    pool: &SqlitePool,
    table: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT checksum FROM dbc_checksum WHERE table_name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

/// Record the baseline checksum right after a fresh import. Any previously
/// recorded source hash is cleared.
pub async fn set_baseline_checksum(
    pool: &SqlitePool,
    table: &str,
    checksum: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO dbc_checksum (table_name, checksum, source_hash) VALUES (?, ?, NULL)
         ON CONFLICT(table_name) DO UPDATE SET checksum = excluded.checksum, source_hash = NULL",
    )
    .bind(table)
    .bind(checksum)
    .execute(pool)
    .await?;
    Ok(())
}

/// BLAKE3 of the baseline file the table was last imported from.
pub async fn source_hash(pool: &SqlitePool, table: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT source_hash FROM dbc_checksum WHERE table_name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|r| r.0))
}

pub async fn set_source_hash(
    pool: &SqlitePool,
    table: &str,
    hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE dbc_checksum SET source_hash = ? WHERE table_name = ?")
        .bind(hash)
        .bind(table)
        .execute(pool)
        .await?;
    Ok(())
}

/// `true` when the live table no longer matches its baseline checksum.
/// Tables without a recorded baseline count as modified.
pub async fn is_modified(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let Some(baseline) = baseline_checksum(pool, table).await? else {
        return Ok(true);
    };
    Ok(live_checksum(pool, table).await? != baseline)
}
