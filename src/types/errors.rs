use thiserror::Error;

use crate::services::dbc::DbcError;

/// Failure kinds surfaced by every workspace command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Not initialized: {0}")]
    NotInitialized(String),
    #[error("Bad input: {0}")]
    BadInput(String),
    #[error("Truncated: {0}")]
    Truncated(String),
    #[error("Bad magic: {0}")]
    BadMagic(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("External failure: {0}")]
    ExternalFailure(String),
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<sqlx::Error> for CommandError {
    fn from(error: sqlx::Error) -> Self {
        CommandError::Database(error.to_string())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(error: std::io::Error) -> Self {
        CommandError::Io(error.to_string())
    }
}

impl From<DbcError> for CommandError {
    fn from(error: DbcError) -> Self {
        match error {
            DbcError::BadMagic(_) => CommandError::BadMagic(error.to_string()),
            DbcError::Truncated { .. } => CommandError::Truncated(error.to_string()),
            DbcError::SchemaMismatch { .. } | DbcError::UnknownFieldType(_) => {
                CommandError::BadInput(error.to_string())
            }
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;
