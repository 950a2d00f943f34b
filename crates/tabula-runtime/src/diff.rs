//! Computes the ordered DDL sequence that converges the current database
//! structure onto the expected one.
//!
//! Ordering rules: schema creations come first, table creations are
//! referenced-before-referencing, foreign keys are added only once both
//! ends exist, and constraint/index drops on a table precede its column
//! drops. Table drops come last, dependents first. Running the resulting
//! statements and diffing again yields an empty diff.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use tabula_core::config::DropMode;
use tabula_core::structure::{
    normalize_default, qualify, quote_ident, ColumnDef, ColumnType, Constraint, DbStructure,
    TableDef,
};

use crate::runner::Statement;

/// Represents the difference between two structures.
#[derive(Debug, Clone)]
pub struct SchemaDiff {
    /// Changes to apply, in execution order.
    pub entries: Vec<DiffEntry>,
}

/// A single diff entry.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// Type of action.
    pub action: DiffAction,
    /// Affected object, qualified.
    pub target: String,
    /// DDL to apply. Self-contained; no bound parameters.
    pub sql: String,
}

/// Type of schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    CreateSchema,
    CreateTable,
    DropTable,
    AddColumn,
    AlterColumn,
    DropColumn,
    AddConstraint,
    DropConstraint,
    CreateIndex,
    DropIndex,
}

/// Diff computation errors.
#[derive(Debug, Error)]
pub enum DiffError {
    /// Dropping mutually-referencing tables has no valid emission order.
    #[error("circular foreign-key dependency prevents dropping tables: {0}")]
    CircularDependency(String),
}

impl SchemaDiff {
    /// Compare current against expected and produce the convergence plan.
    pub fn between(
        current: &DbStructure,
        expected: &DbStructure,
        drop_mode: DropMode,
    ) -> Result<Self, DiffError> {
        let mut entries = Vec::new();

        for name in expected.schemas.keys() {
            if current.schema(name).is_none() {
                entries.push(DiffEntry {
                    action: DiffAction::CreateSchema,
                    target: name.clone(),
                    sql: format!("CREATE SCHEMA IF NOT EXISTS {};", quote_ident(name)),
                });
            }
        }

        let mut new_tables: Vec<TableRef<'_>> = Vec::new();
        for (schema_name, schema) in &expected.schemas {
            for (table_name, table) in &schema.tables {
                if current.table(schema_name, table_name).is_none() {
                    new_tables.push((schema_name.as_str(), table));
                }
            }
        }
        for (schema_name, table) in creation_order(new_tables) {
            entries.push(DiffEntry {
                action: DiffAction::CreateTable,
                target: format!("{}.{}", schema_name, table.name),
                sql: create_table_sql(schema_name, table),
            });
        }

        for (schema_name, schema) in &expected.schemas {
            for (table_name, table) in &schema.tables {
                if let Some(current_table) = current.table(schema_name, table_name) {
                    diff_table(&mut entries, schema_name, current_table, table, drop_mode);
                }
            }
        }

        // Foreign keys go last among additions so both the referencing and
        // referenced side are guaranteed to exist.
        for (schema_name, schema) in &expected.schemas {
            for (table_name, table) in &schema.tables {
                let current_table = current.table(schema_name, table_name);
                for constraint in table.constraints.iter().filter(|c| c.is_foreign_key()) {
                    let already = current_table
                        .map(|t| t.constraints.iter().any(|c| c.same_as(constraint)))
                        .unwrap_or(false);
                    if !already {
                        entries.push(DiffEntry {
                            action: DiffAction::AddConstraint,
                            target: format!("{}.{}", schema_name, table_name),
                            sql: constraint.add_sql(&qualify(schema_name, table_name)),
                        });
                    }
                }
            }
        }

        if drop_mode.allows_table_drops() {
            let mut doomed: Vec<TableRef<'_>> = Vec::new();
            for (schema_name, schema) in &current.schemas {
                for (table_name, table) in &schema.tables {
                    if expected.table(schema_name, table_name).is_none() {
                        doomed.push((schema_name.as_str(), table));
                    }
                }
            }
            for (schema_name, table) in drop_order(doomed)? {
                entries.push(DiffEntry {
                    action: DiffAction::DropTable,
                    target: format!("{}.{}", schema_name, table.name),
                    sql: format!("DROP TABLE {};", qualify(schema_name, &table.name)),
                });
            }
        }

        Ok(Self { entries })
    }

    /// Check if there are any changes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into runner statements (DDL carries no parameters).
    pub fn statements(&self) -> Vec<Statement> {
        self.entries
            .iter()
            .map(|e| Statement::new(e.sql.clone()))
            .collect()
    }
}

fn diff_table(
    entries: &mut Vec<DiffEntry>,
    schema: &str,
    current: &TableDef,
    expected: &TableDef,
    drop_mode: DropMode,
) {
    let label = format!("{}.{}", schema, expected.name);
    let qualified = qualify(schema, &expected.name);

    // Constraint and index drops must precede the column drops they may
    // depend on.
    if drop_mode.allows_constraint_drops() {
        for constraint in &current.constraints {
            let kept = expected.constraints.iter().any(|e| e.same_as(constraint));
            if !kept {
                entries.push(DiffEntry {
                    action: DiffAction::DropConstraint,
                    target: label.clone(),
                    sql: format!(
                        "ALTER TABLE {} DROP CONSTRAINT {};",
                        qualified,
                        quote_ident(constraint.name())
                    ),
                });
            }
        }
        for index in &current.indexes {
            let kept = expected.indexes.iter().any(|e| e.name == index.name);
            if !kept {
                entries.push(DiffEntry {
                    action: DiffAction::DropIndex,
                    target: label.clone(),
                    sql: format!("DROP INDEX {};", qualify(schema, &index.name)),
                });
            }
        }
    }

    for column in &expected.columns {
        if current.column(&column.name).is_none() {
            let (sql, backfilled) = add_column_sql(&qualified, column);
            entries.push(DiffEntry {
                action: DiffAction::AddColumn,
                target: format!("{}.{}", label, column.name),
                sql,
            });
            if backfilled {
                // The synthesized backfill default is not part of the
                // expected structure; clear it so the next diff is empty.
                entries.push(DiffEntry {
                    action: DiffAction::AlterColumn,
                    target: format!("{}.{}", label, column.name),
                    sql: format!(
                        "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                        qualified,
                        quote_ident(&column.name)
                    ),
                });
            }
        }
    }

    for column in &expected.columns {
        let Some(current_column) = current.column(&column.name) else {
            continue;
        };
        alter_column(entries, &label, &qualified, current_column, column);
    }

    if drop_mode.allows_column_drops() {
        for column in &current.columns {
            if expected.column(&column.name).is_none() {
                entries.push(DiffEntry {
                    action: DiffAction::DropColumn,
                    target: format!("{}.{}", label, column.name),
                    sql: format!(
                        "ALTER TABLE {} DROP COLUMN {};",
                        qualified,
                        quote_ident(&column.name)
                    ),
                });
            }
        }
    }

    for constraint in &expected.constraints {
        if constraint.is_foreign_key() {
            continue;
        }
        if !current.constraints.iter().any(|c| c.same_as(constraint)) {
            entries.push(DiffEntry {
                action: DiffAction::AddConstraint,
                target: label.clone(),
                sql: constraint.add_sql(&qualified),
            });
        }
    }
    for index in &expected.indexes {
        if !current.indexes.iter().any(|c| c.name == index.name) {
            entries.push(DiffEntry {
                action: DiffAction::CreateIndex,
                target: format!("{}.{}", schema, index.name),
                sql: index.create_sql(&qualified),
            });
        }
    }
}

fn alter_column(
    entries: &mut Vec<DiffEntry>,
    label: &str,
    qualified: &str,
    current: &ColumnDef,
    expected: &ColumnDef,
) {
    let target = format!("{}.{}", label, expected.name);
    let column = quote_ident(&expected.name);

    if current.column_type != expected.column_type {
        let ty = expected.column_type.to_sql();
        entries.push(DiffEntry {
            action: DiffAction::AlterColumn,
            target: target.clone(),
            sql: format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
                qualified, column, ty, column, ty
            ),
        });
    }

    if current.nullable != expected.nullable {
        let clause = if expected.nullable {
            "DROP NOT NULL"
        } else {
            "SET NOT NULL"
        };
        entries.push(DiffEntry {
            action: DiffAction::AlterColumn,
            target: target.clone(),
            sql: format!(
                "ALTER TABLE {} ALTER COLUMN {} {};",
                qualified, column, clause
            ),
        });
    }

    let current_default = current.default.as_deref().map(normalize_default);
    let expected_default = expected.default.as_deref().map(normalize_default);
    if current_default != expected_default {
        let sql = match &expected.default {
            Some(default) => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
                qualified, column, default
            ),
            None => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                qualified, column
            ),
        };
        entries.push(DiffEntry {
            action: DiffAction::AlterColumn,
            target,
            sql,
        });
    }
}

fn create_table_sql(schema: &str, table: &TableDef) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {}", c.to_sql()))
        .collect();
    for constraint in &table.constraints {
        if let Some(sql) = constraint.table_sql() {
            lines.push(format!("    {}", sql));
        }
    }
    format!(
        "CREATE TABLE {} (\n{}\n);",
        qualify(schema, &table.name),
        lines.join(",\n")
    )
}

/// Render an ADD COLUMN statement. A NOT NULL column without a declared
/// default needs a backfill default so the statement succeeds on populated
/// tables; the second element reports whether one was synthesized.
fn add_column_sql(qualified: &str, column: &ColumnDef) -> (String, bool) {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        qualified,
        quote_ident(&column.name),
        column.column_type.to_sql()
    );

    let mut backfilled = false;
    if let Some(ref default) = column.default {
        sql.push_str(&format!(" DEFAULT {}", default));
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
    } else if !column.nullable {
        let backfill = match column.column_type {
            ColumnType::Varchar(_) | ColumnType::Text => "''",
            ColumnType::Integer | ColumnType::BigInt => "0",
            ColumnType::Numeric | ColumnType::DoublePrecision => "0",
            ColumnType::Boolean => "false",
            ColumnType::Timestamptz => "NOW()",
            ColumnType::Date => "CURRENT_DATE",
            ColumnType::Uuid => "gen_random_uuid()",
            ColumnType::Jsonb => "'{}'::jsonb",
            _ => "NULL",
        };
        sql.push_str(&format!(" NOT NULL DEFAULT {}", backfill));
        backfilled = true;
    }

    sql.push(';');
    (sql, backfilled)
}

type TableRef<'a> = (&'a str, &'a TableDef);

fn table_key(entry: &TableRef<'_>) -> String {
    format!("{}.{}", entry.0, entry.1.name)
}

/// Foreign-key dependency edges within a set of tables: key → the keys it
/// references. Self-references and references outside the set are ignored.
fn dependency_edges(tables: &[TableRef<'_>]) -> BTreeMap<String, BTreeSet<String>> {
    let keys: BTreeSet<String> = tables.iter().map(table_key).collect();
    let mut edges = BTreeMap::new();
    for entry in tables {
        let key = table_key(entry);
        let mut references = BTreeSet::new();
        for constraint in &entry.1.constraints {
            if let Constraint::ForeignKey {
                references_schema,
                references_table,
                ..
            } = constraint
            {
                let target = format!("{}.{}", references_schema, references_table);
                if target != key && keys.contains(&target) {
                    references.insert(target);
                }
            }
        }
        edges.insert(key, references);
    }
    edges
}

/// Order table creations referenced-first. Cycles are tolerated here
/// because foreign keys are added in a later phase.
fn creation_order(mut tables: Vec<TableRef<'_>>) -> Vec<TableRef<'_>> {
    tables.sort_by(|a, b| table_key(a).cmp(&table_key(b)));
    let edges = dependency_edges(&tables);

    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut ordered = Vec::new();
    let mut remaining = tables;
    while !remaining.is_empty() {
        let mut progressed = false;
        let mut next_round = Vec::new();
        for entry in remaining {
            let key = table_key(&entry);
            let ready = edges
                .get(&key)
                .map(|deps| deps.iter().all(|t| placed.contains(t)))
                .unwrap_or(true);
            if ready {
                placed.insert(key);
                ordered.push(entry);
                progressed = true;
            } else {
                next_round.push(entry);
            }
        }
        if !progressed {
            ordered.extend(next_round);
            break;
        }
        remaining = next_round;
    }
    ordered
}

/// Order table drops dependents-first. A referencing table must go before
/// the table it references; a cycle leaves no valid order.
fn drop_order(mut tables: Vec<TableRef<'_>>) -> Result<Vec<TableRef<'_>>, DiffError> {
    tables.sort_by(|a, b| table_key(a).cmp(&table_key(b)));
    let edges = dependency_edges(&tables);

    let mut dropped: BTreeSet<String> = BTreeSet::new();
    let mut ordered = Vec::new();
    let mut remaining = tables;
    while !remaining.is_empty() {
        let mut progressed = false;
        let mut next_round = Vec::new();
        for entry in remaining {
            let key = table_key(&entry);
            let referenced = edges.iter().any(|(other, references)| {
                other != &key && !dropped.contains(other) && references.contains(&key)
            });
            if !referenced {
                dropped.insert(key);
                ordered.push(entry);
                progressed = true;
            } else {
                next_round.push(entry);
            }
        }
        if !progressed {
            let names: Vec<String> = next_round.iter().map(table_key).collect();
            return Err(DiffError::CircularDependency(names.join(", ")));
        }
        remaining = next_round;
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use tabula_core::compile::compile;
    use tabula_core::definition::{FieldDef, ModelDefinition};

    fn compiled(models: Vec<ModelDefinition>) -> DbStructure {
        let definitions: Map<String, ModelDefinition> = models
            .into_iter()
            .map(|m| (format!("{}_{}", m.namespace, m.name), m))
            .collect();
        compile(&definitions).unwrap()
    }

    fn shop_item() -> ModelDefinition {
        ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text))
            .field(FieldDef::new("price", ColumnType::Numeric))
    }

    fn shop_order() -> ModelDefinition {
        ModelDefinition::new("shop", "order")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("item_id", ColumnType::Integer).references("item"))
    }

    #[test]
    fn test_identical_structures_diff_empty() {
        let expected = compiled(vec![shop_item(), shop_order()]);
        let diff = SchemaDiff::between(&expected, &expected, DropMode::Full).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_create_from_empty() {
        let expected = compiled(vec![shop_item()]);
        let diff =
            SchemaDiff::between(&DbStructure::new(), &expected, DropMode::Full).unwrap();

        assert_eq!(diff.entries[0].action, DiffAction::CreateSchema);
        assert_eq!(
            diff.entries[0].sql,
            "CREATE SCHEMA IF NOT EXISTS \"shop\";"
        );
        assert_eq!(diff.entries[1].action, DiffAction::CreateTable);
        assert!(diff.entries[1].sql.contains("CREATE TABLE \"shop\".\"item\""));
        assert!(diff.entries[1].sql.contains("\"id\" INTEGER NOT NULL"));
        assert!(diff.entries[1].sql.contains("\"price\" NUMERIC NOT NULL"));
        assert!(diff.entries[1]
            .sql
            .contains("CONSTRAINT \"item_pkey\" PRIMARY KEY (\"id\")"));
    }

    // A model named after a reserved word must still render runnable DDL.
    #[test]
    fn test_reserved_word_identifiers_are_quoted() {
        let expected = compiled(vec![shop_item(), shop_order()]);
        let diff =
            SchemaDiff::between(&DbStructure::new(), &expected, DropMode::Full).unwrap();

        let create = diff
            .entries
            .iter()
            .find(|e| e.action == DiffAction::CreateTable && e.target == "shop.order")
            .unwrap();
        assert!(create.sql.starts_with("CREATE TABLE \"shop\".\"order\""));

        let fk = diff
            .entries
            .iter()
            .find(|e| e.action == DiffAction::AddConstraint)
            .unwrap();
        assert!(fk
            .sql
            .starts_with("ALTER TABLE \"shop\".\"order\" ADD CONSTRAINT \"order_item_id_fkey\""));
        assert!(fk.sql.contains("REFERENCES \"shop\".\"item\" (\"id\")"));

        let drops = SchemaDiff::between(&expected, &DbStructure::new(), DropMode::Full).unwrap();
        assert!(drops
            .entries
            .iter()
            .any(|e| e.sql == "DROP TABLE \"shop\".\"order\";"));
    }

    #[test]
    fn test_referenced_table_created_first_and_fk_added_last() {
        let expected = compiled(vec![shop_item(), shop_order()]);
        let diff =
            SchemaDiff::between(&DbStructure::new(), &expected, DropMode::Full).unwrap();

        let item_pos = diff
            .entries
            .iter()
            .position(|e| e.action == DiffAction::CreateTable && e.target == "shop.item")
            .unwrap();
        let order_pos = diff
            .entries
            .iter()
            .position(|e| e.action == DiffAction::CreateTable && e.target == "shop.order")
            .unwrap();
        let fk_pos = diff
            .entries
            .iter()
            .position(|e| e.action == DiffAction::AddConstraint && e.sql.contains("FOREIGN KEY"))
            .unwrap();

        assert!(item_pos < order_pos);
        assert!(order_pos < fk_pos);
        // Creation SQL itself carries no FK; it is a separate phase.
        assert!(!diff.entries[order_pos].sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_add_column() {
        let current = compiled(vec![ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text))]);
        let expected = compiled(vec![shop_item()]);

        let diff = SchemaDiff::between(&current, &expected, DropMode::Full).unwrap();
        assert_eq!(diff.entries[0].action, DiffAction::AddColumn);
        assert_eq!(
            diff.entries[0].sql,
            "ALTER TABLE \"shop\".\"item\" ADD COLUMN \"price\" NUMERIC NOT NULL DEFAULT 0;"
        );
        // Synthesized backfill default is cleared right after.
        assert_eq!(diff.entries[1].action, DiffAction::AlterColumn);
        assert!(diff.entries[1].sql.ends_with("DROP DEFAULT;"));
    }

    #[test]
    fn test_alter_column_type_uses_cast() {
        let current = compiled(vec![ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text))
            .field(FieldDef::new("price", ColumnType::Integer))]);
        let expected = compiled(vec![shop_item()]);

        let diff = SchemaDiff::between(&current, &expected, DropMode::Full).unwrap();
        assert_eq!(diff.entries.len(), 1);
        assert_eq!(
            diff.entries[0].sql,
            "ALTER TABLE \"shop\".\"item\" ALTER COLUMN \"price\" TYPE NUMERIC USING \"price\"::NUMERIC;"
        );
    }

    #[test]
    fn test_nullability_change() {
        let current = compiled(vec![ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text).nullable())
            .field(FieldDef::new("price", ColumnType::Numeric))]);
        let expected = compiled(vec![shop_item()]);

        let diff = SchemaDiff::between(&current, &expected, DropMode::Full).unwrap();
        assert_eq!(diff.entries.len(), 1);
        assert_eq!(
            diff.entries[0].sql,
            "ALTER TABLE \"shop\".\"item\" ALTER COLUMN \"name\" SET NOT NULL;"
        );
    }

    #[test]
    fn test_equivalent_defaults_do_not_churn() {
        let mut current = compiled(vec![shop_item()]);
        let expected = compiled(vec![ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text).default_expr("'unnamed'"))
            .field(FieldDef::new("price", ColumnType::Numeric))]);

        // Simulate the catalog's cast-suffixed rendering of the default.
        if let Some(schema) = current.schemas.get_mut("shop") {
            if let Some(table) = schema.tables.get_mut("item") {
                if let Some(col) = table.columns.iter_mut().find(|c| c.name == "name") {
                    col.default = Some("'unnamed'::text".into());
                }
            }
        }

        let diff = SchemaDiff::between(&current, &expected, DropMode::Full).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_drop_column_honors_drop_mode() {
        let current = compiled(vec![shop_item()]);
        let expected = compiled(vec![ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text))]);

        let full = SchemaDiff::between(&current, &expected, DropMode::Full).unwrap();
        assert!(full
            .entries
            .iter()
            .any(|e| e.action == DiffAction::DropColumn && e.sql.contains("price")));

        let none = SchemaDiff::between(&current, &expected, DropMode::None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_constraint_drop_precedes_column_drop() {
        let current = compiled(vec![ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text))
            .field(FieldDef::new("code", ColumnType::Text).unique())]);
        let expected = compiled(vec![ModelDefinition::new("shop", "item")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())
            .field(FieldDef::new("name", ColumnType::Text))]);

        let diff = SchemaDiff::between(&current, &expected, DropMode::Full).unwrap();
        let constraint_pos = diff
            .entries
            .iter()
            .position(|e| e.action == DiffAction::DropConstraint)
            .unwrap();
        let column_pos = diff
            .entries
            .iter()
            .position(|e| e.action == DiffAction::DropColumn)
            .unwrap();
        assert!(constraint_pos < column_pos);
    }

    #[test]
    fn test_doomed_tables_drop_dependents_first() {
        let current = compiled(vec![shop_item(), shop_order()]);
        let expected = compiled(vec![ModelDefinition::new("crm", "contact")
            .field(FieldDef::new("id", ColumnType::Integer).primary_key())]);

        let diff = SchemaDiff::between(&current, &expected, DropMode::Full).unwrap();
        let drops: Vec<&str> = diff
            .entries
            .iter()
            .filter(|e| e.action == DiffAction::DropTable)
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(drops, vec!["shop.order", "shop.item"]);
    }

    #[test]
    fn test_circular_drop_is_an_error() {
        let mut current = DbStructure::new();
        let schema = current.ensure_schema("shop");
        for (name, other) in [("a", "b"), ("b", "a")] {
            let mut table = TableDef::new(name);
            table.columns.push(ColumnDef {
                name: "id".into(),
                column_type: ColumnType::Integer,
                nullable: false,
                default: None,
                ordinal: 1,
            });
            table.constraints.push(Constraint::ForeignKey {
                name: format!("{}_other_fkey", name),
                columns: vec!["id".into()],
                references_schema: "shop".into(),
                references_table: other.into(),
                references_columns: vec!["id".into()],
            });
            schema.tables.insert(name.to_string(), table);
        }

        let err =
            SchemaDiff::between(&current, &DbStructure::new(), DropMode::Full).unwrap_err();
        assert!(matches!(err, DiffError::CircularDependency(_)));
    }

    #[test]
    fn test_statements_carry_no_parameters() {
        let expected = compiled(vec![shop_item()]);
        let diff =
            SchemaDiff::between(&DbStructure::new(), &expected, DropMode::Full).unwrap();
        let statements = diff.statements();
        assert_eq!(statements.len(), diff.entries.len());
        assert!(statements.iter().all(|s| s.params.is_empty()));
    }
}
