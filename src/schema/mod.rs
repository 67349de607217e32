//! Record schemas and the schema registry.
//!
//! A [`RecordSchema`] is a structural contract for the shape of a data value:
//! a named set of typed fields. Schemas constrain node outputs in two
//! directions — validating raw function/tool results before they enter the
//! run context, and projecting to a JSON-Schema response constraint for
//! structured LLM calls.

pub mod error;
pub mod registry;

pub use error::{SchemaError, SchemaMismatch};
pub use registry::SchemaRegistry;

// ================================
// Field types
// ================================

/// The type of a schema field. `Record` references another registered schema
/// by name; registration order guarantees the reference tree is finite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    List(Box<FieldType>),
    Record(String),
}

impl FieldType {
    /// Human-readable type name used in mismatch errors.
    pub fn name(&self) -> String {
        match self {
            FieldType::String => "string".to_string(),
            FieldType::Integer => "integer".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::List(inner) => format!("list[{}]", inner.name()),
            FieldType::Record(name) => format!("record[{}]", name),
        }
    }
}

/// The observed type of a JSON value, for mismatch messages.
pub(crate) fn value_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "float",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ================================
// Field and record definitions
// ================================

/// A single schema field: name, type, required flag and optional description.
/// Descriptions are forwarded into the JSON-Schema projection so the LLM sees
/// them.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        FieldSpec {
            name: name.into(),
            ty,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        FieldSpec {
            name: name.into(),
            ty,
            required: false,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named set of fields. Unknown fields are rejected during validation
/// unless `allow_extra` is set.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub allow_extra: bool,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        RecordSchema {
            name: name.into(),
            fields,
            allow_extra: false,
        }
    }

    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}
