//! Database-facing half of the engine: introspection, diffing, statement
//! execution, runtime models, and seed data, tied together by [`Storage`].

pub mod diff;
pub mod error;
pub mod introspect;
pub mod model;
pub mod runner;
pub mod seed;
pub mod storage;

pub use diff::{DiffAction, DiffEntry, DiffError, SchemaDiff};
pub use error::{Result, StorageError};
pub use introspect::introspect;
pub use model::{build_models, RuntimeModel};
pub use runner::{run_statements, SqlParam, Statement, StatementError};
pub use seed::{load_seed_data, SeedDataset};
pub use storage::Storage;
