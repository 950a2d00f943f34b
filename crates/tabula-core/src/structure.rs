use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical database structure, shared between introspection (current
/// state) and compilation (expected state) so the two sides compare
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbStructure {
    /// Schemas by name.
    pub schemas: BTreeMap<String, SchemaDef>,
}

impl DbStructure {
    /// Create an empty structure.
    pub fn new() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// Look up a schema by name.
    pub fn schema(&self, name: &str) -> Option<&SchemaDef> {
        self.schemas.get(name)
    }

    /// Get or create a schema.
    pub fn ensure_schema(&mut self, name: &str) -> &mut SchemaDef {
        self.schemas
            .entry(name.to_string())
            .or_insert_with(|| SchemaDef::new(name))
    }

    /// Look up a table by schema and table name.
    pub fn table(&self, schema: &str, table: &str) -> Option<&TableDef> {
        self.schemas.get(schema).and_then(|s| s.tables.get(table))
    }
}

/// A database schema and its tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,

    /// Tables by name.
    pub tables: BTreeMap<String, TableDef>,
}

impl SchemaDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: BTreeMap::new(),
        }
    }
}

/// A table: ordered columns plus constraints and indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,

    /// Columns in ordinal order.
    pub columns: Vec<ColumnDef>,

    pub constraints: Vec<Constraint>,

    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key column names, in constraint order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.constraints
            .iter()
            .find_map(|c| match c {
                Constraint::PrimaryKey { columns, .. } => {
                    Some(columns.iter().map(String::as_str).collect())
                }
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// A single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<String>,
    pub ordinal: i32,
}

impl ColumnDef {
    /// Render the column clause of a CREATE TABLE / ADD COLUMN statement.
    pub fn to_sql(&self) -> String {
        let mut parts = vec![quote_ident(&self.name), self.column_type.to_sql()];

        if !self.nullable {
            parts.push("NOT NULL".to_string());
        }

        if let Some(ref default) = self.default {
            parts.push(format!("DEFAULT {}", default));
        }

        parts.join(" ")
    }
}

/// PostgreSQL column types understood by the engine. Catalog types outside
/// this set round-trip through `Other` with their raw name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Uuid,
    /// Variable-length string with optional max length.
    Varchar(Option<u32>),
    Text,
    Integer,
    BigInt,
    Numeric,
    DoublePrecision,
    Boolean,
    Timestamptz,
    Date,
    Jsonb,
    /// Any catalog type the engine does not model; compared by raw name.
    Other(String),
}

impl ColumnType {
    /// Generate the SQL type declaration.
    pub fn to_sql(&self) -> String {
        match self {
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Varchar(None) => "VARCHAR(255)".to_string(),
            ColumnType::Varchar(Some(len)) => format!("VARCHAR({})", len),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Numeric => "NUMERIC".to_string(),
            ColumnType::DoublePrecision => "DOUBLE PRECISION".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Timestamptz => "TIMESTAMPTZ".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
            ColumnType::Other(name) => name.clone(),
        }
    }

    /// The type name used in `$n::type` placeholder casts. Text-encoded
    /// values (uuids, timestamps) rely on these casts to reach the column
    /// type, since parameters are sent with concrete wire types.
    pub fn cast_type(&self) -> String {
        match self {
            ColumnType::Uuid => "uuid".to_string(),
            ColumnType::Varchar(_) | ColumnType::Text => "text".to_string(),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::Numeric => "numeric".to_string(),
            ColumnType::DoublePrecision => "float8".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Timestamptz => "timestamptz".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::Jsonb => "jsonb".to_string(),
            ColumnType::Other(name) => name.to_lowercase(),
        }
    }

    /// Map an `information_schema` type name back onto the canonical type.
    pub fn from_catalog(data_type: &str, character_maximum_length: Option<i32>) -> Self {
        match data_type.to_ascii_lowercase().as_str() {
            "uuid" => ColumnType::Uuid,
            "character varying" | "character" => {
                ColumnType::Varchar(character_maximum_length.map(|n| n as u32))
            }
            "text" => ColumnType::Text,
            "integer" => ColumnType::Integer,
            "bigint" => ColumnType::BigInt,
            "numeric" => ColumnType::Numeric,
            "double precision" => ColumnType::DoublePrecision,
            "boolean" => ColumnType::Boolean,
            "timestamp with time zone" => ColumnType::Timestamptz,
            "date" => ColumnType::Date,
            "jsonb" => ColumnType::Jsonb,
            other => ColumnType::Other(other.to_uppercase()),
        }
    }
}

/// Table constraints. Names follow the PostgreSQL default naming scheme
/// (`<table>_pkey`, `<table>_<col>_key`, `<table>_<col>_fkey`) so compiled
/// and introspected structures agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    PrimaryKey {
        name: String,
        columns: Vec<String>,
    },
    Unique {
        name: String,
        columns: Vec<String>,
    },
    ForeignKey {
        name: String,
        columns: Vec<String>,
        references_schema: String,
        references_table: String,
        references_columns: Vec<String>,
    },
    Check {
        name: String,
        expression: String,
    },
}

impl Constraint {
    pub fn name(&self) -> &str {
        match self {
            Constraint::PrimaryKey { name, .. }
            | Constraint::Unique { name, .. }
            | Constraint::ForeignKey { name, .. }
            | Constraint::Check { name, .. } => name,
        }
    }

    /// Columns the constraint is declared on (empty for checks).
    pub fn columns(&self) -> &[String] {
        match self {
            Constraint::PrimaryKey { columns, .. }
            | Constraint::Unique { columns, .. }
            | Constraint::ForeignKey { columns, .. } => columns,
            Constraint::Check { .. } => &[],
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self, Constraint::ForeignKey { .. })
    }

    /// Structural equality, ignoring names. Used when diffing so a renamed
    /// but otherwise identical constraint is not churned.
    pub fn same_as(&self, other: &Constraint) -> bool {
        match (self, other) {
            (
                Constraint::PrimaryKey { columns: a, .. },
                Constraint::PrimaryKey { columns: b, .. },
            ) => a == b,
            (Constraint::Unique { columns: a, .. }, Constraint::Unique { columns: b, .. }) => {
                a == b
            }
            (
                Constraint::ForeignKey {
                    columns: a,
                    references_schema: asch,
                    references_table: atab,
                    references_columns: acols,
                    ..
                },
                Constraint::ForeignKey {
                    columns: b,
                    references_schema: bsch,
                    references_table: btab,
                    references_columns: bcols,
                    ..
                },
            ) => a == b && asch == bsch && atab == btab && acols == bcols,
            (
                Constraint::Check { expression: a, .. },
                Constraint::Check { expression: b, .. },
            ) => normalize_expression(a) == normalize_expression(b),
            _ => false,
        }
    }

    /// Render the constraint body for a CREATE TABLE statement. Foreign
    /// keys are never rendered inline; they are added in a later phase once
    /// both ends exist.
    pub fn table_sql(&self) -> Option<String> {
        match self {
            Constraint::PrimaryKey { name, columns } => Some(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(name),
                quoted_list(columns)
            )),
            Constraint::Unique { name, columns } => Some(format!(
                "CONSTRAINT {} UNIQUE ({})",
                quote_ident(name),
                quoted_list(columns)
            )),
            Constraint::Check { name, expression } => Some(format!(
                "CONSTRAINT {} CHECK ({})",
                quote_ident(name),
                expression
            )),
            Constraint::ForeignKey { .. } => None,
        }
    }

    /// Render an ALTER TABLE ... ADD CONSTRAINT statement. The table is
    /// passed already quoted.
    pub fn add_sql(&self, qualified_table: &str) -> String {
        let body = match self {
            Constraint::PrimaryKey { name, columns } => format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(name),
                quoted_list(columns)
            ),
            Constraint::Unique { name, columns } => format!(
                "CONSTRAINT {} UNIQUE ({})",
                quote_ident(name),
                quoted_list(columns)
            ),
            Constraint::Check { name, expression } => format!(
                "CONSTRAINT {} CHECK ({})",
                quote_ident(name),
                expression
            ),
            Constraint::ForeignKey {
                name,
                columns,
                references_schema,
                references_table,
                references_columns,
            } => format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_ident(name),
                quoted_list(columns),
                qualify(references_schema, references_table),
                quoted_list(references_columns)
            ),
        };
        format!("ALTER TABLE {} ADD {};", qualified_table, body)
    }
}

/// A standalone index (not one backing a PK/UNIQUE constraint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn create_sql(&self, qualified_table: &str) -> String {
        let unique = if self.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            quote_ident(&self.name),
            qualified_table,
            quoted_list(&self.columns)
        )
    }
}

/// Quote an identifier for embedding in SQL. Always quoting keeps reserved
/// words like `order` or `user` usable as schema, table, and column names.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a quoted `schema.table` reference.
pub fn qualify(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn quoted_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strip the `::type` suffix the catalog appends to stored defaults, so
/// `'draft'::text` compares equal to the declared `'draft'`.
pub fn normalize_default(expr: &str) -> String {
    let trimmed = expr.trim();
    if let Some(idx) = trimmed.rfind("::") {
        let suffix = &trimmed[idx + 2..];
        if !suffix.is_empty()
            && suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
        {
            return trimmed[..idx].to_string();
        }
    }
    trimmed.to_string()
}

fn normalize_expression(expr: &str) -> String {
    let trimmed = expr.trim();
    let trimmed = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_to_sql() {
        assert_eq!(ColumnType::Uuid.to_sql(), "UUID");
        assert_eq!(ColumnType::Varchar(Some(100)).to_sql(), "VARCHAR(100)");
        assert_eq!(ColumnType::Varchar(None).to_sql(), "VARCHAR(255)");
        assert_eq!(ColumnType::Numeric.to_sql(), "NUMERIC");
        assert_eq!(ColumnType::Other("BYTEA".into()).to_sql(), "BYTEA");
    }

    #[test]
    fn test_column_type_from_catalog() {
        assert_eq!(
            ColumnType::from_catalog("character varying", Some(255)),
            ColumnType::Varchar(Some(255))
        );
        assert_eq!(
            ColumnType::from_catalog("timestamp with time zone", None),
            ColumnType::Timestamptz
        );
        assert_eq!(ColumnType::from_catalog("integer", None), ColumnType::Integer);
        assert_eq!(
            ColumnType::from_catalog("bytea", None),
            ColumnType::Other("BYTEA".into())
        );
    }

    #[test]
    fn test_column_to_sql() {
        let col = ColumnDef {
            name: "name".into(),
            column_type: ColumnType::Text,
            nullable: false,
            default: Some("'unnamed'".into()),
            ordinal: 1,
        };
        assert_eq!(col.to_sql(), "\"name\" TEXT NOT NULL DEFAULT 'unnamed'");

        let col = ColumnDef {
            name: "note".into(),
            column_type: ColumnType::Text,
            nullable: true,
            default: None,
            ordinal: 2,
        };
        assert_eq!(col.to_sql(), "\"note\" TEXT");
    }

    #[test]
    fn test_normalize_default() {
        assert_eq!(normalize_default("'draft'::text"), "'draft'");
        assert_eq!(normalize_default("now()"), "now()");
        assert_eq!(
            normalize_default("'a::b'::character varying"),
            "'a::b'"
        );
        assert_eq!(normalize_default("0"), "0");
    }

    #[test]
    fn test_constraint_same_as_ignores_name() {
        let a = Constraint::Unique {
            name: "item_code_key".into(),
            columns: vec!["code".into()],
        };
        let b = Constraint::Unique {
            name: "legacy_code_uq".into(),
            columns: vec!["code".into()],
        };
        assert!(a.same_as(&b));

        let c = Constraint::PrimaryKey {
            name: "item_pkey".into(),
            columns: vec!["code".into()],
        };
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_foreign_key_add_sql() {
        let fk = Constraint::ForeignKey {
            name: "order_item_id_fkey".into(),
            columns: vec!["item_id".into()],
            references_schema: "shop".into(),
            references_table: "item".into(),
            references_columns: vec!["id".into()],
        };
        assert_eq!(
            fk.add_sql(&qualify("shop", "order")),
            "ALTER TABLE \"shop\".\"order\" ADD CONSTRAINT \"order_item_id_fkey\" \
             FOREIGN KEY (\"item_id\") REFERENCES \"shop\".\"item\" (\"id\");"
        );
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
        assert_eq!(qualify("shop", "user"), "\"shop\".\"user\"");
    }

    #[test]
    fn test_primary_key_lookup() {
        let mut table = TableDef::new("item");
        table.constraints.push(Constraint::PrimaryKey {
            name: "item_pkey".into(),
            columns: vec!["id".into()],
        });
        assert_eq!(table.primary_key(), vec!["id"]);
        assert!(TableDef::new("empty").primary_key().is_empty());
    }
}
