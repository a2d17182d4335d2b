use crate::types::errors::{CommandError, CommandResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Open the relational store for one command. A single connection keeps
/// in-memory databases coherent; callers close the pool on return.
pub async fn connect(url: &str) -> CommandResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| CommandError::BadInput(format!("Invalid database URL {url}: {e}")))?
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| CommandError::ExternalFailure(format!("Failed to connect to {url}: {e}")))
}
