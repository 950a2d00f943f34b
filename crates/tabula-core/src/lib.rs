pub mod compile;
pub mod config;
pub mod definition;
pub mod error;
pub mod messages;
pub mod structure;

pub use compile::{compile, normalize_identifier};
pub use config::{DropMode, StorageConfig};
pub use definition::{FieldDef, ModelDefinition, Reference};
pub use error::CompileError;
pub use messages::{MessageSink, NullSink};
pub use structure::{
    qualify, quote_ident, ColumnDef, ColumnType, Constraint, DbStructure, IndexDef, SchemaDef,
    TableDef,
};
