//! Runtime model accessors over materialized tables.
//!
//! Models are rebuilt from the synchronized structure on every boot and
//! keyed `<schema>_<table>`. Rows travel as `serde_json::Value` objects:
//! reads decode through `to_jsonb`, writes bind typed parameters with
//! `$n::type` placeholder casts so text-encoded values (uuids, timestamps)
//! convert server-side.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sqlx::{PgConnection, Row};
use tracing::debug;

use tabula_core::structure::{qualify, quote_ident, ColumnDef, ColumnType, DbStructure};

use crate::error::{Result, StorageError};
use crate::runner::{SqlParam, Statement};

/// A queryable handle over one materialized table.
#[derive(Debug, Clone)]
pub struct RuntimeModel {
    /// Registry key, `<schema>_<table>`.
    pub key: String,
    pub schema: String,
    pub table: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnDef>,
    /// Primary-key column names, in constraint order.
    pub primary_key: Vec<String>,
}

/// Build the model registry from a synchronized structure.
pub fn build_models(structure: &DbStructure) -> BTreeMap<String, RuntimeModel> {
    let mut models = BTreeMap::new();
    for (schema_name, schema) in &structure.schemas {
        for (table_name, table) in &schema.tables {
            let key = format!("{}_{}", schema_name, table_name);
            models.insert(
                key.clone(),
                RuntimeModel {
                    key,
                    schema: schema_name.clone(),
                    table: table_name.clone(),
                    columns: table.columns.clone(),
                    primary_key: table
                        .primary_key()
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                },
            );
        }
    }
    debug!(models = models.len(), "built model registry");
    models
}

impl RuntimeModel {
    /// The schema-qualified table name, for keys and error text.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// The quoted table reference used in generated SQL.
    fn sql_table(&self) -> String {
        qualify(&self.schema, &self.table)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Fetch at most one row matching the column-equality predicate,
    /// decoded as a JSON object.
    pub async fn find_one(
        &self,
        conn: &mut PgConnection,
        predicate: &Map<String, Value>,
    ) -> Result<Option<Value>> {
        let (columns, params) = self.predicate_parts(predicate)?;
        let sql = self.select_sql(&columns);
        debug!(model = %self.key, sql = %sql, "find_one");

        let mut query = sqlx::query(&sql);
        for param in params {
            query = param.bind(query);
        }
        match query
            .fetch_optional(&mut *conn)
            .await
            .map_err(StorageError::Sql)?
        {
            Some(row) => Ok(Some(row.try_get(0).map_err(StorageError::Sql)?)),
            None => Ok(None),
        }
    }

    /// Apply column changes to the rows matching the predicate. Matching
    /// zero rows is an error; updates are meant to hit something.
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        changes: &Map<String, Value>,
        predicate: &Map<String, Value>,
    ) -> Result<u64> {
        if changes.is_empty() {
            return Err(StorageError::Query(format!(
                "update on {} has no changes",
                self.qualified()
            )));
        }
        let mut change_columns = Vec::new();
        let mut params = Vec::new();
        for (name, value) in changes {
            let column = self.require_column(name)?;
            params.push(self.param_for(column, value)?);
            change_columns.push(column);
        }
        let (predicate_columns, predicate_params) = self.predicate_parts(predicate)?;
        params.extend(predicate_params);

        let sql = self.update_sql(&change_columns, &predicate_columns);
        debug!(model = %self.key, sql = %sql, "update");

        let mut query = sqlx::query(&sql);
        for param in params {
            query = param.bind(query);
        }
        let result = query.execute(&mut *conn).await.map_err(StorageError::Sql)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::UpdateNoMatch {
                table: self.qualified(),
            });
        }
        Ok(result.rows_affected())
    }

    /// Build a single idempotent multi-row upsert statement: insert every
    /// row, and on primary-key conflict overwrite the non-key columns.
    pub fn upsert_statement(
        &self,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<Statement> {
        if self.primary_key.is_empty() {
            return Err(StorageError::NoPrimaryKey {
                table: self.qualified(),
            });
        }
        if rows.is_empty() {
            return Err(StorageError::Query(format!(
                "upsert on {} has no rows",
                self.qualified()
            )));
        }

        let mut defs = Vec::with_capacity(columns.len());
        for name in columns {
            defs.push(self.require_column(name)?);
        }
        for key_column in &self.primary_key {
            if !columns.contains(key_column) {
                return Err(StorageError::MissingKeyValue {
                    table: self.qualified(),
                    column: key_column.clone(),
                });
            }
        }

        let mut params = Vec::with_capacity(rows.len() * defs.len());
        let mut value_groups = Vec::with_capacity(rows.len());
        let mut placeholder = 1;
        for row in rows {
            if row.len() != defs.len() {
                return Err(StorageError::Query(format!(
                    "row width {} does not match column list width {} on {}",
                    row.len(),
                    defs.len(),
                    self.qualified()
                )));
            }
            let mut group = Vec::with_capacity(defs.len());
            for (def, value) in defs.iter().zip(row) {
                if value.is_null() && self.primary_key.contains(&def.name) {
                    return Err(StorageError::MissingKeyValue {
                        table: self.qualified(),
                        column: def.name.clone(),
                    });
                }
                params.push(self.param_for(def, value)?);
                group.push(format!("${}::{}", placeholder, def.column_type.cast_type()));
                placeholder += 1;
            }
            value_groups.push(format!("({})", group.join(", ")));
        }

        let non_key: Vec<&String> = columns
            .iter()
            .filter(|c| !self.primary_key.contains(c))
            .collect();
        let conflict_action = if non_key.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments: Vec<String> = non_key
                .iter()
                .map(|c| format!("{} = EXCLUDED.{}", quote_ident(c), quote_ident(c)))
                .collect();
            format!("DO UPDATE SET {}", assignments.join(", "))
        };

        let quoted = |names: &[String]| {
            names
                .iter()
                .map(|n| quote_ident(n))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) {};",
            self.sql_table(),
            quoted(columns),
            value_groups.join(", "),
            quoted(&self.primary_key),
            conflict_action
        );
        Ok(Statement { sql, params })
    }

    /// Render the lookup query for the given predicate columns.
    fn select_sql(&self, predicate_columns: &[&ColumnDef]) -> String {
        let clauses: Vec<String> = predicate_columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "t.{} = ${}::{}",
                    quote_ident(&c.name),
                    i + 1,
                    c.column_type.cast_type()
                )
            })
            .collect();
        format!(
            "SELECT to_jsonb(t) FROM {} t WHERE {}",
            self.sql_table(),
            clauses.join(" AND ")
        )
    }

    /// Render the update statement. Predicate placeholders continue after
    /// the change placeholders, matching the parameter order.
    fn update_sql(
        &self,
        change_columns: &[&ColumnDef],
        predicate_columns: &[&ColumnDef],
    ) -> String {
        let mut placeholder = 0;
        let mut clause = |c: &ColumnDef| {
            placeholder += 1;
            format!(
                "{} = ${}::{}",
                quote_ident(&c.name),
                placeholder,
                c.column_type.cast_type()
            )
        };
        let assignments: Vec<String> = change_columns.iter().map(|c| clause(c)).collect();
        let clauses: Vec<String> = predicate_columns.iter().map(|c| clause(c)).collect();
        format!(
            "UPDATE {} SET {} WHERE {};",
            self.sql_table(),
            assignments.join(", "),
            clauses.join(" AND ")
        )
    }

    fn predicate_parts(
        &self,
        predicate: &Map<String, Value>,
    ) -> Result<(Vec<&ColumnDef>, Vec<SqlParam>)> {
        if predicate.is_empty() {
            return Err(StorageError::Query(format!(
                "predicate on {} names no columns",
                self.qualified()
            )));
        }
        let mut columns = Vec::with_capacity(predicate.len());
        let mut params = Vec::with_capacity(predicate.len());
        for (name, value) in predicate {
            let column = self.require_column(name)?;
            params.push(self.param_for(column, value)?);
            columns.push(column);
        }
        Ok((columns, params))
    }

    fn require_column(&self, name: &str) -> Result<&ColumnDef> {
        self.column(name).ok_or_else(|| StorageError::UnknownColumn {
            table: self.qualified(),
            column: name.to_string(),
        })
    }

    /// Convert a JSON value into a typed parameter for the given column.
    /// Strings are accepted for every non-JSON column; the placeholder cast
    /// converts them server-side.
    fn param_for(&self, column: &ColumnDef, value: &Value) -> Result<SqlParam> {
        if value.is_null() {
            return Ok(SqlParam::Null(column.column_type.clone()));
        }
        let param = match (&column.column_type, value) {
            (ColumnType::Jsonb, v) => Some(SqlParam::Json(v.clone())),
            (ColumnType::Boolean, Value::Bool(b)) => Some(SqlParam::Bool(*b)),
            (ColumnType::Integer | ColumnType::BigInt, Value::Number(n)) => {
                n.as_i64().map(SqlParam::Int)
            }
            (ColumnType::Numeric | ColumnType::DoublePrecision, Value::Number(n)) => {
                match n.as_i64() {
                    Some(i) => Some(SqlParam::Int(i)),
                    None => n.as_f64().map(SqlParam::Float),
                }
            }
            (_, Value::String(s)) => Some(SqlParam::Text(s.clone())),
            _ => None,
        };
        param.ok_or_else(|| StorageError::InvalidValue {
            table: self.qualified(),
            column: column.name.clone(),
            ty: column.column_type.to_sql(),
        })
    }
}
