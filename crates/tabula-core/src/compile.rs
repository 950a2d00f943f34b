use std::collections::BTreeMap;

use crate::definition::ModelDefinition;
use crate::error::CompileError;
use crate::structure::{ColumnDef, ColumnType, Constraint, DbStructure, IndexDef, TableDef};

/// Normalize a namespace, model, or field name into a SQL identifier:
/// camelCase boundaries and non-alphanumeric runs become single
/// underscores, everything lowercased. Lossy, so the compiler rejects
/// namespace collisions instead of merging them.
pub fn normalize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut boundary = true;
    let mut prev_lower = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() {
                if prev_lower && !boundary {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
                prev_lower = false;
            } else {
                out.push(c.to_ascii_lowercase());
                prev_lower = true;
            }
            boundary = false;
        } else {
            if !boundary && !out.is_empty() {
                out.push('_');
            }
            boundary = true;
            prev_lower = false;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Compile model definitions into the expected database structure.
///
/// Pure: no I/O, and the same definitions always yield the same structure.
/// Generated constraint names follow the PostgreSQL defaults so the result
/// compares cleanly against introspected state.
pub fn compile(
    definitions: &BTreeMap<String, ModelDefinition>,
) -> Result<DbStructure, CompileError> {
    let mut structure = DbStructure::new();
    let mut namespaces: BTreeMap<String, String> = BTreeMap::new();
    let mut primary_keys: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

    for definition in definitions.values() {
        let schema_name = normalize_identifier(&definition.namespace);
        match namespaces.get(&schema_name) {
            Some(existing) if existing != &definition.namespace => {
                return Err(CompileError::NamespaceCollision {
                    first: existing.clone(),
                    second: definition.namespace.clone(),
                    schema: schema_name,
                });
            }
            Some(_) => {}
            None => {
                namespaces.insert(schema_name.clone(), definition.namespace.clone());
            }
        }

        let table_name = normalize_identifier(&definition.name);
        let model_label = format!("{}_{}", schema_name, table_name);

        let schema = structure.ensure_schema(&schema_name);
        if schema.tables.contains_key(&table_name) {
            return Err(CompileError::DuplicateModel {
                schema: schema_name,
                model: table_name,
            });
        }

        let mut table = TableDef::new(&table_name);
        let mut pk_columns = Vec::new();

        for (position, field) in definition.fields.iter().enumerate() {
            let column_name = normalize_identifier(&field.name);
            if table.column(&column_name).is_some() {
                return Err(CompileError::DuplicateField {
                    model: model_label,
                    field: column_name,
                });
            }

            table.columns.push(ColumnDef {
                name: column_name.clone(),
                column_type: canonical_type(&field.column_type),
                nullable: field.nullable && !field.primary_key,
                default: field.default.clone(),
                ordinal: position as i32 + 1,
            });

            if field.primary_key {
                pk_columns.push(column_name.clone());
            }
            if field.unique && !field.primary_key {
                table.constraints.push(Constraint::Unique {
                    name: format!("{}_{}_key", table_name, column_name),
                    columns: vec![column_name.clone()],
                });
            }
            if field.indexed {
                table.indexes.push(IndexDef {
                    name: format!("{}_{}_idx", table_name, column_name),
                    columns: vec![column_name],
                    unique: false,
                });
            }
        }

        if pk_columns.is_empty() {
            return Err(CompileError::MissingPrimaryKey { model: model_label });
        }
        table.constraints.insert(
            0,
            Constraint::PrimaryKey {
                name: format!("{}_pkey", table_name),
                columns: pk_columns.clone(),
            },
        );

        primary_keys.insert((schema_name.clone(), table_name.clone()), pk_columns);
        schema.tables.insert(table_name, table);
    }

    // Second pass: resolve cross-model references into foreign keys, now
    // that every target's primary key is known.
    for definition in definitions.values() {
        let schema_name = normalize_identifier(&definition.namespace);
        let table_name = normalize_identifier(&definition.name);
        let model_label = format!("{}_{}", schema_name, table_name);

        for field in &definition.fields {
            let Some(ref reference) = field.references else {
                continue;
            };
            let target_schema = reference
                .namespace
                .as_deref()
                .map(normalize_identifier)
                .unwrap_or_else(|| schema_name.clone());
            let target_table = normalize_identifier(&reference.model);
            let target_label = format!("{}_{}", target_schema, target_table);

            let Some(pk) = primary_keys.get(&(target_schema.clone(), target_table.clone()))
            else {
                return Err(CompileError::UnknownReference {
                    model: model_label,
                    target: target_label,
                });
            };
            if pk.len() != 1 {
                return Err(CompileError::CompositeKeyReference {
                    model: model_label,
                    target: target_label,
                });
            }

            let column_name = normalize_identifier(&field.name);
            if let Some(table) = structure
                .schemas
                .get_mut(&schema_name)
                .and_then(|s| s.tables.get_mut(&table_name))
            {
                table.constraints.push(Constraint::ForeignKey {
                    name: format!("{}_{}_fkey", table_name, column_name),
                    columns: vec![column_name],
                    references_schema: target_schema,
                    references_table: target_table,
                    references_columns: pk.clone(),
                });
            }
        }
    }

    Ok(structure)
}

/// Pin unsized types to the concrete form they take in the catalog, so the
/// compiled structure compares equal to an introspected one.
fn canonical_type(column_type: &ColumnType) -> ColumnType {
    match column_type {
        ColumnType::Varchar(None) => ColumnType::Varchar(Some(255)),
        other => other.clone(),
    }
}
