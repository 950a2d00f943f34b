//! Boot-time synchronization and the runtime entry point.
//!
//! A boot cycle is: compile the declared models, introspect the affected
//! schemas, diff, apply the convergence plan transactionally, build the
//! model registry, then load seed data. The whole cycle runs on one owned
//! connection; nothing else may touch the affected schemas while it runs.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sqlx::{Connection, PgConnection};
use tracing::info;

use tabula_core::compile::compile;
use tabula_core::config::StorageConfig;
use tabula_core::definition::ModelDefinition;
use tabula_core::messages::{self, MessageSink};

use crate::diff::SchemaDiff;
use crate::error::{Result, StorageError};
use crate::introspect::introspect;
use crate::model::{build_models, RuntimeModel};
use crate::runner::run_statements;
use crate::seed::{load_seed_data, SeedDataset};

/// A synchronized storage engine: the connection it booted on plus the
/// model registry keyed `<schema>_<table>`.
pub struct Storage {
    conn: PgConnection,
    models: BTreeMap<String, RuntimeModel>,
}

impl Storage {
    /// Open the engine's connection and apply its session settings.
    pub async fn connect(config: &StorageConfig) -> Result<PgConnection> {
        let mut conn = PgConnection::connect(&config.url)
            .await
            .map_err(StorageError::Sql)?;
        sqlx::query(&format!(
            "SET statement_timeout = {}",
            config.statement_timeout_secs * 1000
        ))
        .execute(&mut conn)
        .await
        .map_err(StorageError::Sql)?;
        Ok(conn)
    }

    /// Converge the database onto the declared models and build the model
    /// registry. Any failure before the registry is built leaves no
    /// partially-applied structure; the convergence plan runs in one
    /// transaction.
    pub async fn boot(
        mut conn: PgConnection,
        definitions: &BTreeMap<String, ModelDefinition>,
        seed_data: Option<&[SeedDataset]>,
        sink: Option<&dyn MessageSink>,
        config: &StorageConfig,
    ) -> Result<Self> {
        let expected = compile(definitions)?;

        let schemas: Vec<String> = expected.schemas.keys().cloned().collect();
        messages::info(
            sink,
            &format!("Getting info for DB schemas: {}...", schemas.join(", ")),
        );
        let current = introspect(&mut conn, &schemas).await?;

        let diff = SchemaDiff::between(&current, &expected, config.drop_mode)?;
        if !diff.is_empty() {
            info!(
                changes = diff.entries.len(),
                "synchronizing database structure"
            );
            messages::info(sink, "Synchronizing database structure...");
            for entry in &diff.entries {
                messages::detail(sink, &entry.target);
            }
            run_statements(&mut conn, &diff.statements()).await?;
        }

        let models = build_models(&expected);
        messages::info(sink, "Models:");
        for key in models.keys() {
            messages::detail(sink, key);
        }

        if let Some(datasets) = seed_data {
            messages::info(sink, "Loading seed data:");
            load_seed_data(&mut conn, &models, datasets, sink).await?;
        }

        Ok(Self { conn, models })
    }

    /// Look up a model by its registry key.
    pub fn model(&self, key: &str) -> Result<&RuntimeModel> {
        self.models
            .get(key)
            .ok_or_else(|| StorageError::ModelNotFound(key.to_string()))
    }

    /// All registry keys, sorted.
    pub fn model_keys(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Fetch at most one row from the named model.
    pub async fn find_one(
        &mut self,
        key: &str,
        predicate: &Map<String, Value>,
    ) -> Result<Option<Value>> {
        let model = self
            .models
            .get(key)
            .ok_or_else(|| StorageError::ModelNotFound(key.to_string()))?;
        model.find_one(&mut self.conn, predicate).await
    }

    /// Apply changes to the matching rows of the named model.
    pub async fn update(
        &mut self,
        key: &str,
        changes: &Map<String, Value>,
        predicate: &Map<String, Value>,
    ) -> Result<u64> {
        let model = self
            .models
            .get(key)
            .ok_or_else(|| StorageError::ModelNotFound(key.to_string()))?;
        model.update(&mut self.conn, changes, predicate).await
    }

    /// Release the underlying connection.
    pub fn into_connection(self) -> PgConnection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_core::config::DropMode;
    use tabula_core::definition::FieldDef;
    use tabula_core::structure::{ColumnType, DbStructure};

    fn shop_definitions() -> BTreeMap<String, ModelDefinition> {
        let mut definitions = BTreeMap::new();
        definitions.insert(
            "shop_item".to_string(),
            ModelDefinition::new("shop", "item")
                .field(FieldDef::new("id", ColumnType::Integer).primary_key())
                .field(FieldDef::new("name", ColumnType::Text))
                .field(FieldDef::new("price", ColumnType::Numeric)),
        );
        definitions.insert(
            "shop_order".to_string(),
            ModelDefinition::new("shop", "order")
                .field(FieldDef::new("id", ColumnType::Integer).primary_key())
                .field(FieldDef::new("item_id", ColumnType::Integer).references("item")),
        );
        definitions
    }

    // The pure half of a boot cycle: compile, diff against an empty
    // database, build models, and prepare the seed upsert.
    #[test]
    fn test_boot_pipeline_without_database() {
        let expected = compile(&shop_definitions()).unwrap();

        let diff =
            SchemaDiff::between(&DbStructure::new(), &expected, DropMode::Full).unwrap();
        let statements = diff.statements();
        assert!(statements[0].sql.contains("CREATE SCHEMA"));
        assert!(statements
            .iter()
            .any(|s| s.sql.contains("CREATE TABLE \"shop\".\"item\"")));
        assert!(statements.last().unwrap().sql.contains("FOREIGN KEY"));

        let models = build_models(&expected);
        assert_eq!(
            models.keys().collect::<Vec<_>>(),
            vec!["shop_item", "shop_order"]
        );

        let seed = SeedDataset {
            namespace: "shop".into(),
            name: "item".into(),
            rows: vec![serde_json::from_value(
                json!({"id": 1, "name": "Pen", "price": "1.50"}),
            )
            .unwrap()],
        };
        let upsert = models[&seed.key()]
            .upsert_statement(
                &["id".to_string(), "name".to_string(), "price".to_string()],
                &[vec![json!(1), json!("Pen"), json!("1.50")]],
            )
            .unwrap();
        assert!(upsert.sql.starts_with("INSERT INTO \"shop\".\"item\""));
        assert!(upsert.sql.contains("ON CONFLICT (\"id\") DO UPDATE SET"));
        assert_eq!(upsert.params.len(), 3);
    }

    // Converging twice produces nothing the second time.
    #[test]
    fn test_reboot_is_idempotent() {
        let expected = compile(&shop_definitions()).unwrap();
        let diff = SchemaDiff::between(&expected, &expected, DropMode::Full).unwrap();
        assert!(diff.is_empty());
    }
}
