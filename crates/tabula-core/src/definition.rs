use serde::{Deserialize, Serialize};

use crate::structure::ColumnType;

/// A declarative model definition, as supplied by the caller at boot.
/// Immutable for the lifetime of a boot cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Namespace the model belongs to; normalized into a schema name.
    pub namespace: String,

    /// Model name; normalized into a table name.
    pub name: String,

    /// Ordered field list.
    pub fields: Vec<FieldDef>,
}

impl ModelDefinition {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// A single declared field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    pub column_type: ColumnType,

    #[serde(default)]
    pub nullable: bool,

    /// Default value expression (SQL).
    #[serde(default)]
    pub default: Option<String>,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub indexed: bool,

    /// Foreign-key relation to another model's primary key.
    #[serde(default)]
    pub references: Option<Reference>,
}

impl FieldDef {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: false,
            default: None,
            primary_key: false,
            unique: false,
            indexed: false,
            references: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn default_expr(mut self, expr: &str) -> Self {
        self.default = Some(expr.to_string());
        self
    }

    /// Reference another model in the same namespace.
    pub fn references(mut self, model: &str) -> Self {
        self.references = Some(Reference {
            namespace: None,
            model: model.to_string(),
        });
        self
    }

    /// Reference a model in another namespace.
    pub fn references_in(mut self, namespace: &str, model: &str) -> Self {
        self.references = Some(Reference {
            namespace: Some(namespace.to_string()),
            model: model.to_string(),
        });
        self
    }
}

/// Target of a foreign-key relation. `namespace: None` means the owning
/// model's namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub namespace: Option<String>,
    pub model: String,
}
