use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Storage failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// True when SQLite rejected a write because of a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Maps a unique violation to `Conflict` with a caller-facing message, anything else to `Storage`.
pub(crate) fn conflict_or_storage(err: rusqlite::Error, message: impl FnOnce() -> String) -> CatalogError {
    if is_unique_violation(&err) {
        CatalogError::Conflict(message())
    } else {
        CatalogError::Storage(err)
    }
}
