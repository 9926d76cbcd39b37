//! Validation of model output against the suggestion schema.

use super::types::SuggestionRecord;
use crate::generator::GenerationError;
use crate::{Error, ErrorContext, Result};
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("static regex"));
static BARE_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").expect("static regex"));

/// JSON Schema for a list of [`SuggestionRecord`]s, derived from the Rust type.
pub fn suggestion_list_schema() -> Value {
    let schema = schemars::schema_for!(Vec<SuggestionRecord>);
    serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({"type": "array"}))
}

/// Turns free-form model output into validated suggestion records.
pub struct SuggestionValidator {
    schema: JSONSchema,
    max_items: usize,
}

impl SuggestionValidator {
    pub fn new() -> Result<Self> {
        let schema_value = suggestion_list_schema();
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("failed to compile suggestion schema: {}", e),
                    ErrorContext::new().with_source("suggestion_validator"),
                )
            })?;
        Ok(Self {
            schema,
            max_items: 10,
        })
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    /// Extract, schema-check and deserialize the array in `content`.
    ///
    /// Accepts a bare array, an array inside a ```json fence, or an array embedded in
    /// prose. Anything else, including an empty array, is an error.
    pub fn parse(&self, content: &str) -> std::result::Result<Vec<SuggestionRecord>, GenerationError> {
        let value = extract_json(content).ok_or_else(|| {
            GenerationError::Malformed("response did not contain a JSON array".into())
        })?;
        let Value::Array(items) = &value else {
            return Err(GenerationError::Malformed(format!(
                "expected a JSON array, got {}",
                json_type_name(&value)
            )));
        };
        if items.is_empty() {
            return Err(GenerationError::Empty);
        }

        if let Err(errors) = self.schema.validate(&value) {
            let messages: Vec<String> = errors
                .take(3)
                .map(|e| format!("{} at '{}'", e, e.instance_path))
                .collect();
            return Err(GenerationError::Schema(messages.join("; ")));
        }

        let mut records: Vec<SuggestionRecord> = serde_json::from_value(value)
            .map_err(|e| GenerationError::Schema(e.to_string()))?;
        for (i, record) in records.iter().enumerate() {
            record
                .check()
                .map_err(|msg| GenerationError::Schema(format!("[{}]: {}", i, msg)))?;
        }
        records.truncate(self.max_items);
        Ok(records)
    }
}

fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
        return Some(parsed);
    }
    if let Some(inner) = FENCED_JSON.captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(parsed) = serde_json::from_str::<Value>(inner.as_str()) {
            return Some(parsed);
        }
    }
    BARE_ARRAY
        .find(trimmed)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
