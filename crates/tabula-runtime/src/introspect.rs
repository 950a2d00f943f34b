//! Reads the live catalog into the canonical structure.
//!
//! The result is the database's current truth for the requested schemas.
//! Nothing is cached; every boot re-fetches.

use std::collections::BTreeMap;

use sqlx::PgConnection;
use tracing::debug;

use tabula_core::structure::{ColumnDef, ColumnType, Constraint, DbStructure, IndexDef, TableDef};

use crate::error::{Result, StorageError};

const COLUMNS_SQL: &str = r#"
SELECT table_schema::text, table_name::text, column_name::text,
       data_type::text, is_nullable::text, column_default::text,
       ordinal_position::int4, character_maximum_length::int4
FROM information_schema.columns
WHERE table_schema = ANY($1)
ORDER BY table_schema, table_name, ordinal_position
"#;

// Foreign-key targets join through referential_constraints and pair each
// referencing column with its referenced column by position, so composite
// keys come back one matched pair per row.
const CONSTRAINTS_SQL: &str = r#"
SELECT tc.table_schema::text, tc.table_name::text,
       tc.constraint_name::text, tc.constraint_type::text,
       kcu.column_name::text,
       fkcu.table_schema::text, fkcu.table_name::text, fkcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
LEFT JOIN information_schema.referential_constraints rc
  ON rc.constraint_schema = tc.constraint_schema
 AND rc.constraint_name = tc.constraint_name
LEFT JOIN information_schema.key_column_usage fkcu
  ON fkcu.constraint_schema = rc.unique_constraint_schema
 AND fkcu.constraint_name = rc.unique_constraint_name
 AND fkcu.ordinal_position = kcu.position_in_unique_constraint
WHERE tc.table_schema = ANY($1)
  AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
ORDER BY tc.table_schema, tc.table_name, tc.constraint_name, kcu.ordinal_position
"#;

// NOT NULL is reflected on the column itself; the catalog's synthetic
// not-null check constraints would otherwise show up as spurious diffs.
const CHECKS_SQL: &str = r#"
SELECT tc.table_schema::text, tc.table_name::text,
       tc.constraint_name::text, cc.check_clause::text
FROM information_schema.table_constraints tc
JOIN information_schema.check_constraints cc
  ON cc.constraint_schema = tc.constraint_schema
 AND cc.constraint_name = tc.constraint_name
WHERE tc.table_schema = ANY($1)
  AND tc.constraint_type = 'CHECK'
  AND tc.constraint_name NOT LIKE '%not_null'
ORDER BY tc.table_schema, tc.table_name, tc.constraint_name
"#;

const INDEXES_SQL: &str = r#"
SELECT schemaname::text, tablename::text, indexname::text, indexdef::text
FROM pg_indexes
WHERE schemaname = ANY($1)
ORDER BY schemaname, tablename, indexname
"#;

/// Read the current structure of the given schemas.
pub async fn introspect(conn: &mut PgConnection, schemas: &[String]) -> Result<DbStructure> {
    let names = schemas.to_vec();
    let mut structure = DbStructure::new();

    let columns: Vec<(
        String,
        String,
        String,
        String,
        String,
        Option<String>,
        i32,
        Option<i32>,
    )> = sqlx::query_as(COLUMNS_SQL)
        .bind(names.clone())
        .fetch_all(&mut *conn)
        .await
        .map_err(StorageError::Introspection)?;

    for (schema, table, column, data_type, is_nullable, default, ordinal, char_max) in columns {
        let table_def = structure
            .ensure_schema(&schema)
            .tables
            .entry(table.clone())
            .or_insert_with(|| TableDef::new(&table));
        table_def.columns.push(ColumnDef {
            name: column,
            column_type: ColumnType::from_catalog(&data_type, char_max),
            nullable: is_nullable == "YES",
            default,
            ordinal,
        });
    }

    let constraint_rows: Vec<ConstraintRow> = sqlx::query_as(CONSTRAINTS_SQL)
        .bind(names.clone())
        .fetch_all(&mut *conn)
        .await
        .map_err(StorageError::Introspection)?;

    for ((schema, table, name), constraint) in fold_constraint_rows(constraint_rows) {
        if let Some(table_def) = table_mut(&mut structure, &schema, &table) {
            if let Some(constraint) = constraint.into_constraint(name) {
                table_def.constraints.push(constraint);
            }
        }
    }

    let check_rows: Vec<(String, String, String, String)> = sqlx::query_as(CHECKS_SQL)
        .bind(names.clone())
        .fetch_all(&mut *conn)
        .await
        .map_err(StorageError::Introspection)?;

    for (schema, table, name, clause) in check_rows {
        if let Some(table_def) = table_mut(&mut structure, &schema, &table) {
            table_def.constraints.push(Constraint::Check {
                name,
                expression: clause,
            });
        }
    }

    let index_rows: Vec<(String, String, String, String)> = sqlx::query_as(INDEXES_SQL)
        .bind(names)
        .fetch_all(&mut *conn)
        .await
        .map_err(StorageError::Introspection)?;

    for (schema, table, name, indexdef) in index_rows {
        if let Some(table_def) = table_mut(&mut structure, &schema, &table) {
            // Indexes backing PK/UNIQUE constraints already appear as
            // constraints; tracking them twice would churn the diff.
            if table_def.constraints.iter().any(|c| c.name() == name) {
                continue;
            }
            table_def.indexes.push(IndexDef {
                columns: parse_index_columns(&indexdef),
                unique: indexdef.starts_with("CREATE UNIQUE"),
                name,
            });
        }
    }

    debug!(
        schemas = structure.schemas.len(),
        "introspected current structure"
    );
    Ok(structure)
}

type ConstraintRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Key constraints span one row per column; fold them back together, in
/// row order so column lists keep their declared positions.
fn fold_constraint_rows(
    rows: Vec<ConstraintRow>,
) -> BTreeMap<(String, String, String), PendingConstraint> {
    let mut pending = BTreeMap::new();
    for (schema, table, name, ctype, column, fschema, ftable, fcolumn) in rows {
        let entry = pending
            .entry((schema, table, name))
            .or_insert_with(|| PendingConstraint {
                ctype,
                columns: Vec::new(),
                foreign_schema: fschema,
                foreign_table: ftable,
                foreign_columns: Vec::new(),
            });
        entry.columns.push(column);
        if let Some(fcolumn) = fcolumn {
            entry.foreign_columns.push(fcolumn);
        }
    }
    pending
}

struct PendingConstraint {
    ctype: String,
    columns: Vec<String>,
    foreign_schema: Option<String>,
    foreign_table: Option<String>,
    foreign_columns: Vec<String>,
}

impl PendingConstraint {
    fn into_constraint(self, name: String) -> Option<Constraint> {
        match self.ctype.as_str() {
            "PRIMARY KEY" => Some(Constraint::PrimaryKey {
                name,
                columns: self.columns,
            }),
            "UNIQUE" => Some(Constraint::Unique {
                name,
                columns: self.columns,
            }),
            "FOREIGN KEY" => Some(Constraint::ForeignKey {
                name,
                columns: self.columns,
                references_schema: self.foreign_schema?,
                references_table: self.foreign_table?,
                references_columns: self.foreign_columns,
            }),
            _ => None,
        }
    }
}

fn table_mut<'a>(
    structure: &'a mut DbStructure,
    schema: &str,
    table: &str,
) -> Option<&'a mut TableDef> {
    structure
        .schemas
        .get_mut(schema)
        .and_then(|s| s.tables.get_mut(table))
}

/// Pull the column list out of a `pg_indexes.indexdef` string, e.g.
/// `CREATE INDEX item_name_idx ON shop.item USING btree (name)`.
fn parse_index_columns(indexdef: &str) -> Vec<String> {
    match (indexdef.rfind('('), indexdef.rfind(')')) {
        (Some(open), Some(close)) if close > open => indexdef[open + 1..close]
            .split(',')
            .map(|c| c.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}
