use thiserror::Error;

/// Errors rejecting a schema at registration time.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema '{0}' is already registered")]
    DuplicateSchema(String),
    #[error("Schema '{schema}': duplicate field '{field}'")]
    DuplicateField { schema: String, field: String },
    #[error("Schema '{schema}': field '{field}' references unregistered schema '{record}'")]
    UnresolvedRecord {
        schema: String,
        field: String,
        record: String,
    },
    #[error("Schema '{schema}': field '{field}' may not reference its own schema")]
    SelfReference { schema: String, field: String },
}

/// A validation failure: the value does not satisfy the schema. The `field`
/// is a dotted path into the value (`author.name`, `items[2].url`).
#[derive(Debug, Error)]
pub enum SchemaMismatch {
    #[error("Schema '{0}' is not registered")]
    UnknownSchema(String),
    #[error("Field '{field}': required but missing")]
    MissingField { field: String },
    #[error("Field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },
    #[error("Field '{field}': not declared by schema '{schema}'")]
    UnknownField { schema: String, field: String },
    #[error("Expected an object for schema '{schema}', got {actual}")]
    NotAnObject { schema: String, actual: String },
}
