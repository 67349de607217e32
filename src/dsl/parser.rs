//! Flow document parser: converts raw YAML/JSON/TOML text into [`FlowSchema`].

use super::schema::{FlowSchema, SUPPORTED_FLOW_VERSIONS};
use crate::error::FlowError;

/// Supported flow document input formats.
#[derive(Debug, Clone, Copy)]
pub enum FlowFormat {
    /// YAML format (`.yaml` / `.yml`).
    Yaml,
    /// JSON format (`.json`).
    Json,
    /// TOML format (`.toml`).
    Toml,
}

/// Parse flow document content into a [`FlowSchema`].
pub fn parse_flow(content: &str, format: FlowFormat) -> Result<FlowSchema, FlowError> {
    let flow: FlowSchema = match format {
        FlowFormat::Yaml => serde_saphyr::from_str(content)
            .map_err(|e| FlowError::ParseError(e.to_string()))?,
        FlowFormat::Json => serde_json::from_str(content)
            .map_err(|e| FlowError::ParseError(e.to_string()))?,
        FlowFormat::Toml => {
            // Parse TOML → toml::Value, then convert to serde_json::Value,
            // and finally deserialize into FlowSchema.  The two-step
            // conversion ensures fields typed as serde_json::Value (e.g.
            // literal input bindings) are handled correctly.
            let toml_val: toml::Value =
                toml::from_str(content).map_err(|e| FlowError::ParseError(e.to_string()))?;
            let json_val = toml_value_to_json(toml_val);
            serde_json::from_value(json_val).map_err(|e| FlowError::ParseError(e.to_string()))?
        }
    };

    if !SUPPORTED_FLOW_VERSIONS.contains(&flow.version.as_str()) {
        return Err(FlowError::UnsupportedVersion {
            found: flow.version,
            supported: SUPPORTED_FLOW_VERSIONS.join(", "),
        });
    }

    Ok(flow)
}

/// Convert a [`toml::Value`] into a [`serde_json::Value`].
///
/// TOML does not have a null type, so `Datetime` values are stringified.
fn toml_value_to_json(val: toml::Value) -> serde_json::Value {
    match val {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_value_to_json).collect())
        }
        toml::Value::Table(tbl) => {
            let map: serde_json::Map<String, serde_json::Value> = tbl
                .into_iter()
                .map(|(k, v)| (k, toml_value_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
    }
}
