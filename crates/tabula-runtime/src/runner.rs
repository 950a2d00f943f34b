//! Sequential statement execution inside a single transaction.
//!
//! Statements run strictly in array order on one connection; later
//! statements may depend on earlier ones (a column must exist before it is
//! indexed or populated), so there is no reordering and no parallelism.

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Connection, PgConnection, Postgres};
use thiserror::Error;
use tracing::debug;

use tabula_core::structure::ColumnType;

/// One SQL statement with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// A typed parameter value. NULLs carry the column type they stand in for,
/// so they are sent with a compatible wire type instead of untyped text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null(ColumnType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl SqlParam {
    /// Bind this parameter onto a query.
    pub fn bind(self, query: Query<'_, Postgres, PgArguments>) -> Query<'_, Postgres, PgArguments> {
        match self {
            SqlParam::Null(ty) => match ty {
                ColumnType::Integer => query.bind(None::<i32>),
                ColumnType::BigInt => query.bind(None::<i64>),
                ColumnType::Boolean => query.bind(None::<bool>),
                ColumnType::Numeric | ColumnType::DoublePrecision => query.bind(None::<f64>),
                ColumnType::Timestamptz => query.bind(None::<chrono::DateTime<chrono::Utc>>),
                ColumnType::Date => query.bind(None::<chrono::NaiveDate>),
                ColumnType::Uuid => query.bind(None::<uuid::Uuid>),
                ColumnType::Jsonb => query.bind(None::<serde_json::Value>),
                _ => query.bind(None::<String>),
            },
            SqlParam::Bool(value) => query.bind(value),
            SqlParam::Int(value) => query.bind(value),
            SqlParam::Float(value) => query.bind(value),
            SqlParam::Text(value) => query.bind(value),
            SqlParam::Json(value) => query.bind(value),
        }
    }
}

/// A failure inside the statement runner. Execution failures carry the
/// position and text of the offending statement; transaction failures are
/// reported as such rather than masquerading as statement errors.
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("statement {index} failed: {sql}")]
    Execution {
        index: usize,
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("transaction could not be started")]
    Begin(#[source] sqlx::Error),

    #[error("transaction could not be committed")]
    Commit(#[source] sqlx::Error),

    /// The rollback after a failed statement itself failed; the database
    /// may be left holding a partial change.
    #[error("rollback failed after statement {index}")]
    Rollback {
        index: usize,
        #[source]
        source: sqlx::Error,
    },
}

/// Execute statements in order inside one transaction. The first failure
/// rolls the whole sequence back; nothing is visible outside the
/// transaction boundary until commit.
pub async fn run_statements(
    conn: &mut PgConnection,
    statements: &[Statement],
) -> Result<(), StatementError> {
    if statements.is_empty() {
        return Ok(());
    }

    let mut tx = conn.begin().await.map_err(StatementError::Begin)?;

    for (index, statement) in statements.iter().enumerate() {
        debug!(index, sql = %statement.sql, "executing statement");

        let mut query = sqlx::query(statement.sql.as_str());
        for param in &statement.params {
            query = param.clone().bind(query);
        }

        if let Err(source) = query.execute(&mut *tx).await {
            if let Err(rollback) = tx.rollback().await {
                return Err(StatementError::Rollback {
                    index,
                    source: rollback,
                });
            }
            return Err(StatementError::Execution {
                index,
                sql: statement.sql.clone(),
                source,
            });
        }
    }

    tx.commit().await.map_err(StatementError::Commit)
}
