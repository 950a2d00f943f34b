use thiserror::Error;

use tabula_core::error::CompileError;

use crate::diff::DiffError;
use crate::runner::StatementError;

/// Engine error taxonomy. Every variant except the seed loader's
/// missing-model warning (which never becomes an error) aborts the
/// boot-time synchronization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The current database structure could not be read.
    #[error("failed to read database structure")]
    Introspection(#[source] sqlx::Error),

    #[error(transparent)]
    Compilation(#[from] CompileError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Statement(#[from] StatementError),

    /// A seed dataset failed to apply; remaining datasets were skipped.
    #[error("seed dataset {dataset:?} failed to load")]
    SeedLoad {
        dataset: String,
        #[source]
        source: Box<StorageError>,
    },

    /// A runtime-model query failed at the database.
    #[error("query failed")]
    Sql(#[source] sqlx::Error),

    /// A malformed predicate or row shape.
    #[error("{0}")]
    Query(String),

    #[error("no row matched update on {table}")]
    UpdateNoMatch { table: String },

    #[error("unknown column {column:?} on {table}")]
    UnknownColumn { table: String, column: String },

    #[error("row for {table} is missing a value for key column {column:?}")]
    MissingKeyValue { table: String, column: String },

    #[error("value for column {column:?} on {table} cannot be stored as {ty}")]
    InvalidValue {
        table: String,
        column: String,
        ty: String,
    },

    #[error("model {table} has no primary key; upsert requires one")]
    NoPrimaryKey { table: String },

    #[error("no model registered under {0:?}")]
    ModelNotFound(String),
}

/// Result type alias using StorageError.
pub type Result<T> = std::result::Result<T, StorageError>;
