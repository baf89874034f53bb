//! Core data types flowing through the conversion pipeline.
//!
//! JSON values are [`serde_json::Value`] throughout. The workspace enables
//! serde_json's `preserve_order` feature, so column order in a [`Row`] and key
//! order in converted objects match what was read.

use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Prefix of a completion text that stands for a backend failure.
pub const BACKEND_ERROR_PREFIX: &str = "Error: ";

/// `error` value of a failure record produced by the normalizer.
pub const INVALID_JSON: &str = "Invalid JSON";

/// One input record: column name to scalar value, in file order.
///
/// Rows are immutable once read; there is no mutating API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Build a row from `(column, value)` pairs, keeping their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Compact JSON object text, as embedded in prompts.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// Unprocessed text returned by a completion backend for one prompt.
///
/// May contain markdown fences, prose, or a backend error marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCompletion(String);

impl RawCompletion {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Render a backend failure as completion text (`"Error: <message>"`).
    pub fn from_backend_error(error: &BackendError) -> Self {
        Self(format!("{}{}", BACKEND_ERROR_PREFIX, error))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether this text is a backend error marker.
    ///
    /// A model that itself answers with "Error: ..." is indistinguishable.
    pub fn is_backend_error(&self) -> bool {
        self.0.starts_with(BACKEND_ERROR_PREFIX)
    }
}

impl fmt::Display for RawCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Diagnostic record kept for a row whose completion was not valid JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Failure kind, [`INVALID_JSON`] for normalizer failures.
    pub error: String,
    /// Completion text as received, before fence stripping.
    pub raw_output: String,
    /// The row that was being converted.
    pub input: Row,
}

impl FailureRecord {
    pub fn invalid_json(raw_output: impl Into<String>, input: Row) -> Self {
        Self {
            error: INVALID_JSON.to_string(),
            raw_output: raw_output.into(),
            input,
        }
    }
}

/// Outcome of converting one row.
///
/// Serialized untagged: the output artifact is a plain array whose elements
/// are either converted objects or `{error, raw_output, input}` records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversionResult {
    Failed(FailureRecord),
    Converted(Value),
}

impl ConversionResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The converted value, if the row parsed.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Converted(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Whether the result carries an `error` marker: a failure record, or a
    /// converted object that itself has an `error` key.
    pub fn carries_error_marker(&self) -> bool {
        match self {
            Self::Failed(_) => true,
            Self::Converted(Value::Object(map)) => map.contains_key("error"),
            Self::Converted(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_row_preserves_column_order() {
        let row = Row::from_pairs([("zeta", json!(1)), ("alpha", json!("a")), ("mid", Value::Null)]);
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["zeta", "alpha", "mid"]);
        assert_eq!(row.to_string(), r#"{"zeta":1,"alpha":"a","mid":null}"#);
    }

    #[test]
    fn test_raw_completion_backend_marker() {
        let raw = RawCompletion::from_backend_error(&BackendError::MissingCredentials);
        assert_eq!(raw.as_str(), "Error: API key is required");
        assert!(raw.is_backend_error());
        assert!(!RawCompletion::new("{\"a\": 1}").is_backend_error());
    }

    #[test]
    fn test_failure_record_serialization_shape() {
        let row = Row::from_pairs([("id", json!("TX1"))]);
        let result = ConversionResult::Failed(FailureRecord::invalid_json("not json", row));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"error": "Invalid JSON", "raw_output": "not json", "input": {"id": "TX1"}})
        );
    }

    #[test]
    fn test_converted_serializes_as_plain_value() {
        let result = ConversionResult::Converted(json!({"name": "Alice"}));
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"name":"Alice"}"#);
    }

    #[test]
    fn test_deserialize_distinguishes_failures() {
        let results: Vec<ConversionResult> = serde_json::from_str(
            r#"[{"name": "Alice"}, {"error": "Invalid JSON", "raw_output": "x", "input": {}}]"#,
        )
        .unwrap();
        assert!(!results[0].is_failure());
        assert!(results[1].is_failure());
    }

    #[test]
    fn test_carries_error_marker() {
        assert!(ConversionResult::Converted(json!({"error": "model refused"})).carries_error_marker());
        assert!(!ConversionResult::Converted(json!({"name": "Bob"})).carries_error_marker());
        assert!(!ConversionResult::Converted(json!(["error"])).carries_error_marker());
    }
}
