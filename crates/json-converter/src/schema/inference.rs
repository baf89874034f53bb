//! Model-assisted schema proposal.

use super::{Schema, SchemaState, describe_hint};
use crate::ai::CompletionClient;
use crate::config::DEFAULT_SCHEMA_SAMPLE_ROWS;
use crate::error::{ConversionError, Result};
use crate::normalizer::ResponseNormalizer;
use crate::prompt::PromptBuilder;
use crate::types::Row;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Asks a completion backend to propose a target schema from sample rows.
///
/// The answer goes through the same fence stripping and strict parse as row
/// conversions. Two shapes are accepted:
///
/// - an object mapping field names to type hints
/// - an array of `{"name": ..., "type" | "description": ...}` objects
///
/// The result is always [`SchemaState::Proposed`].
pub struct SchemaInference<'a> {
    client: &'a dyn CompletionClient,
    sample_rows: usize,
}

impl<'a> SchemaInference<'a> {
    pub fn new(client: &'a dyn CompletionClient) -> Self {
        Self {
            client,
            sample_rows: DEFAULT_SCHEMA_SAMPLE_ROWS,
        }
    }

    /// Number of leading rows shown to the model (at least 1).
    pub fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows.max(1);
        self
    }

    /// Propose a schema for `rows` using `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::SchemaInference`] when `rows` is empty (the
    /// backend is not called), when the backend fails, or when the answer is
    /// not one of the accepted shapes.
    pub fn propose(&self, rows: &[Row], model: &str) -> Result<SchemaState> {
        if rows.is_empty() {
            return Err(ConversionError::SchemaInference(
                "no rows to sample".to_string(),
            ));
        }

        let sample = &rows[..rows.len().min(self.sample_rows)];
        let model = self.client.resolve_model(model);
        info!(
            "Inferring schema from {} sample rows with {} / {}",
            sample.len(),
            self.client.name(),
            model
        );

        let prompt = PromptBuilder::schema_inference_prompt(sample);
        let raw = self.client.complete(&prompt, model);
        if raw.is_backend_error() {
            warn!("Schema inference request failed: {}", raw);
            return Err(ConversionError::SchemaInference(raw.into_inner()));
        }

        let value = ResponseNormalizer::parse(raw.as_str())
            .map_err(|e| ConversionError::SchemaInference(e.to_string()))?;

        let schema = schema_from_answer(&value).ok_or_else(|| {
            ConversionError::SchemaInference(format!(
                "expected an object of field descriptions, got: {}",
                value
            ))
        })?;

        debug!("Proposed schema: {:?}", schema.keys());
        Ok(SchemaState::Proposed(schema))
    }
}

fn schema_from_answer(value: &Value) -> Option<Schema> {
    let schema = match value {
        Value::Object(map) => map
            .iter()
            .fold(Schema::new(), |schema, (name, hint)| {
                schema.with_field(name.as_str(), describe_hint(hint))
            }),
        Value::Array(items) => items.iter().try_fold(Schema::new(), |schema, item| {
            let entry = item.as_object()?;
            let name = entry.get("name")?.as_str()?;
            let hint = entry
                .get("type")
                .or_else(|| entry.get("description"))
                .unwrap_or(&Value::Null);
            Some(schema.with_field(name, describe_hint(hint)))
        })?,
        _ => return None,
    };

    (!schema.is_empty()).then_some(schema)
}
