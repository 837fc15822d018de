// Registry error taxonomy
// Every store failure is converted at the operation boundary into one of these.

use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Store unreachable, unopenable, or the connection handle is unusable
    #[error("Failed to connect to database: {0}")]
    ConnectionFailure(String),

    /// Duplicate primary key or duplicate biometric marker
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Target record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other store-reported failure, raw message kept
    #[error("Database error: {0}")]
    Database(String),
}

impl RegistryError {
    /// Short machine-readable kind, used by the HTTP surface
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::ConnectionFailure(_) => "connection_failure",
            RegistryError::Conflict(_) => "conflict",
            RegistryError::NotFound(_) => "not_found",
            RegistryError::Database(_) => "database_error",
        }
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let detail = msg.clone().unwrap_or_else(|| e.to_string());
                match e.code {
                    ErrorCode::ConstraintViolation => RegistryError::Conflict(detail),
                    ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::PermissionDenied
                    | ErrorCode::SystemIoFailure => RegistryError::ConnectionFailure(detail),
                    _ => RegistryError::Database(detail),
                }
            }
            _ => RegistryError::Database(err.to_string()),
        }
    }
}
