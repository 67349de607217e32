//! Schema registry: registration-time invariant checks, recursive structural
//! validation, and JSON-Schema projection for LLM response constraints.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::{SchemaError, SchemaMismatch};
use super::{value_type_name, FieldType, RecordSchema};

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Registry of named record schemas.
///
/// `Record` fields may only reference schemas registered earlier and never
/// their own schema, which keeps the nested type tree finite by construction.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<RecordSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry {
            schemas: HashMap::new(),
        }
    }

    /// Register a schema, enforcing the schema invariants: unique field
    /// names, and record references that resolve to already-registered
    /// schemas other than the schema itself.
    pub fn register(&mut self, schema: RecordSchema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(SchemaError::DuplicateSchema(schema.name));
        }

        let mut seen = std::collections::HashSet::new();
        for field in &schema.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: schema.name.clone(),
                    field: field.name.clone(),
                });
            }
            self.check_record_refs(&schema.name, &field.name, &field.ty)?;
        }

        self.schemas.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    fn check_record_refs(
        &self,
        schema: &str,
        field: &str,
        ty: &FieldType,
    ) -> Result<(), SchemaError> {
        match ty {
            FieldType::List(inner) => self.check_record_refs(schema, field, inner),
            FieldType::Record(record) => {
                if record == schema {
                    return Err(SchemaError::SelfReference {
                        schema: schema.to_string(),
                        field: field.to_string(),
                    });
                }
                if !self.schemas.contains_key(record) {
                    return Err(SchemaError::UnresolvedRecord {
                        schema: schema.to_string(),
                        field: field.to_string(),
                        record: record.clone(),
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<RecordSchema>> {
        self.schemas.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Validate `value` against the named schema, returning the canonical
    /// value: exactly the declared fields, in declaration order.
    pub fn validate(&self, name: &str, value: &Value) -> Result<Value, SchemaMismatch> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaMismatch::UnknownSchema(name.to_string()))?;
        self.validate_record(&schema, value, "")
    }

    fn validate_record(
        &self,
        schema: &RecordSchema,
        value: &Value,
        path: &str,
    ) -> Result<Value, SchemaMismatch> {
        let Value::Object(map) = value else {
            return Err(SchemaMismatch::NotAnObject {
                schema: schema.name.clone(),
                actual: value_type_name(value).to_string(),
            });
        };

        if !schema.allow_extra {
            for key in map.keys() {
                if schema.field(key).is_none() {
                    return Err(SchemaMismatch::UnknownField {
                        schema: schema.name.clone(),
                        field: join_path(path, key),
                    });
                }
            }
        }

        let mut canonical = Map::new();
        for field in &schema.fields {
            let field_path = join_path(path, &field.name);
            match map.get(&field.name) {
                Some(raw) => {
                    let validated = self.validate_value(&field.ty, raw, &field_path)?;
                    canonical.insert(field.name.clone(), validated);
                }
                None if field.required => {
                    return Err(SchemaMismatch::MissingField { field: field_path });
                }
                None => {}
            }
        }

        Ok(Value::Object(canonical))
    }

    fn validate_value(
        &self,
        ty: &FieldType,
        value: &Value,
        path: &str,
    ) -> Result<Value, SchemaMismatch> {
        let mismatch = || SchemaMismatch::TypeMismatch {
            field: path.to_string(),
            expected: ty.name(),
            actual: value_type_name(value).to_string(),
        };

        match ty {
            FieldType::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldType::Integer => match value.as_i64() {
                Some(i) => Ok(Value::from(i)),
                None => Err(mismatch()),
            },
            FieldType::Float => match value.as_f64() {
                // Integers widen to float in canonical form.
                Some(f) => Ok(serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or_else(|| value.clone())),
                None => Err(mismatch()),
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldType::List(inner) => match value {
                Value::Array(items) => {
                    let mut canonical = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        let item_path = format!("{}[{}]", path, i);
                        canonical.push(self.validate_value(inner, item, &item_path)?);
                    }
                    Ok(Value::Array(canonical))
                }
                _ => Err(mismatch()),
            },
            FieldType::Record(name) => {
                let schema = self
                    .get(name)
                    .ok_or_else(|| SchemaMismatch::UnknownSchema(name.clone()))?;
                self.validate_record(&schema, value, path)
            }
        }
    }

    /// Project the named schema to a JSON-Schema object usable as an LLM
    /// structured-output constraint. Nested records are inlined.
    pub fn json_schema(&self, name: &str) -> Result<Value, SchemaMismatch> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaMismatch::UnknownSchema(name.to_string()))?;
        self.record_json_schema(&schema)
    }

    fn record_json_schema(&self, schema: &RecordSchema) -> Result<Value, SchemaMismatch> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &schema.fields {
            let mut property = self.type_json_schema(&field.ty)?;
            if let (Some(desc), Some(obj)) = (&field.description, property.as_object_mut()) {
                obj.insert("description".to_string(), Value::String(desc.clone()));
            }
            properties.insert(field.name.clone(), property);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        Ok(serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": schema.allow_extra,
        }))
    }

    fn type_json_schema(&self, ty: &FieldType) -> Result<Value, SchemaMismatch> {
        Ok(match ty {
            FieldType::String => serde_json::json!({ "type": "string" }),
            FieldType::Integer => serde_json::json!({ "type": "integer" }),
            FieldType::Float => serde_json::json!({ "type": "number" }),
            FieldType::Boolean => serde_json::json!({ "type": "boolean" }),
            FieldType::List(inner) => serde_json::json!({
                "type": "array",
                "items": self.type_json_schema(inner)?,
            }),
            FieldType::Record(name) => {
                let schema = self
                    .get(name)
                    .ok_or_else(|| SchemaMismatch::UnknownSchema(name.clone()))?;
                self.record_json_schema(&schema)?
            }
        })
    }
}
