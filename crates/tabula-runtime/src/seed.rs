//! Seed data loading.
//!
//! Datasets apply strictly in order, one idempotent upsert per dataset.
//! A dataset naming a model that does not exist is reported and skipped;
//! a dataset that fails to apply aborts the remainder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgConnection;
use tracing::{debug, warn};

use tabula_core::compile::normalize_identifier;
use tabula_core::messages::{self, MessageSink};

use crate::error::{Result, StorageError};
use crate::model::RuntimeModel;
use crate::runner::{run_statements, Statement};

/// Rows to pre-populate one model with. Each row maps column names to
/// literal values; the loader flattens them positionally against the
/// model's column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDataset {
    /// Namespace of the target model, in raw (unnormalized) form.
    pub namespace: String,

    /// Name of the target model, in raw form.
    pub name: String,

    pub rows: Vec<Map<String, Value>>,
}

impl SeedDataset {
    /// The registry key of the model this dataset targets.
    pub fn key(&self) -> String {
        format!(
            "{}_{}",
            normalize_identifier(&self.namespace),
            normalize_identifier(&self.name)
        )
    }
}

/// Apply datasets against the model registry.
pub async fn load_seed_data(
    conn: &mut PgConnection,
    models: &BTreeMap<String, RuntimeModel>,
    datasets: &[SeedDataset],
    sink: Option<&dyn MessageSink>,
) -> Result<()> {
    for dataset in datasets {
        let Some(statement) = prepare_dataset(models, dataset, sink)? else {
            continue;
        };
        run_statements(conn, &[statement])
            .await
            .map_err(|source| StorageError::SeedLoad {
                dataset: dataset.key(),
                source: Box::new(StorageError::Statement(source)),
            })?;
    }
    Ok(())
}

/// Resolve a dataset to its upsert statement. `None` means the dataset is
/// skipped: either it names no known model (reported, never an error) or
/// it carries no rows.
fn prepare_dataset(
    models: &BTreeMap<String, RuntimeModel>,
    dataset: &SeedDataset,
    sink: Option<&dyn MessageSink>,
) -> Result<Option<Statement>> {
    let key = dataset.key();
    let Some(model) = models.get(&key) else {
        warn!(dataset = %key, "seed data names no known model, skipping");
        messages::detail(
            sink,
            &format!(
                "WARNING: seed data found for model {}, but no such model exists",
                key
            ),
        );
        return Ok(None);
    };
    if dataset.rows.is_empty() {
        debug!(dataset = %key, "seed data has no rows, skipping");
        return Ok(None);
    }

    messages::detail(sink, &format!("{} ({} rows)", key, dataset.rows.len()));
    flatten(model, &dataset.rows)
        .and_then(|(columns, rows)| model.upsert_statement(&columns, &rows))
        .map(Some)
        .map_err(|source| StorageError::SeedLoad {
            dataset: key,
            source: Box::new(source),
        })
}

/// Flatten map rows into a column list and positional rows. The column
/// list is every model column some row supplies, in the model's column
/// order; a row that omits one of those columns contributes a NULL.
/// Unknown columns fail fast instead of being dropped.
fn flatten(
    model: &RuntimeModel,
    rows: &[Map<String, Value>],
) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    for row in rows {
        for key in row.keys() {
            if model.column(key).is_none() {
                return Err(StorageError::UnknownColumn {
                    table: model.qualified(),
                    column: key.clone(),
                });
            }
        }
    }

    let columns: Vec<String> = model
        .columns
        .iter()
        .filter(|c| rows.iter().any(|r| r.contains_key(&c.name)))
        .map(|c| c.name.clone())
        .collect();
    let flat = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    Ok((columns, flat))
}
