use thiserror::Error;

/// Errors raised while compiling model definitions into an expected
/// database structure. Any of these aborts the boot-time synchronization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Two distinct namespaces normalize to the same schema identifier.
    /// Normalization is lossy, so this is rejected rather than silently
    /// merging the namespaces.
    #[error("namespaces {first:?} and {second:?} both normalize to schema {schema:?}")]
    NamespaceCollision {
        first: String,
        second: String,
        schema: String,
    },

    #[error("duplicate model {model:?} in schema {schema:?}")]
    DuplicateModel { schema: String, model: String },

    #[error("duplicate field {field:?} on model {model:?}")]
    DuplicateField { model: String, field: String },

    #[error("model {model:?} declares no primary-key field")]
    MissingPrimaryKey { model: String },

    #[error("model {model:?} references unknown model {target:?}")]
    UnknownReference { model: String, target: String },

    #[error("model {model:?} references {target:?}, whose composite primary key cannot be the target of a single-column foreign key")]
    CompositeKeyReference { model: String, target: String },
}
