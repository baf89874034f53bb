//! Schema extraction from reference artifacts.

use super::Schema;
use crate::error::{ConversionError, Result};
use crate::loader::{TabularFormat, read_headers};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Derives target field names from a reference artifact.
///
/// - Delimited text and spreadsheets: the header row, in file order.
/// - JSON arrays: the keys of the first element (empty array, or a first
///   element that is not an object, gives an empty schema).
/// - JSON objects: the top-level keys.
/// - Any other JSON value: an empty schema.
///
/// Files with an unrecognised extension are read as spreadsheets.
pub struct SchemaExtractor;

impl SchemaExtractor {
    /// Extract a schema from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Extraction`] when the file cannot be read or
    /// is not valid for its type.
    pub fn extract(path: impl AsRef<Path>) -> Result<Schema> {
        let path = path.as_ref();
        info!("Extracting schema from: {}", path.display());

        let schema = if is_json(path) {
            let text = std::fs::read_to_string(path).map_err(|e| extraction_error(path, e))?;
            Self::from_json_str(&text).map_err(|e| extraction_error(path, e))?
        } else {
            let format = TabularFormat::from_path(path).unwrap_or(TabularFormat::Spreadsheet);
            let headers = read_headers(path, format).map_err(|e| extraction_error(path, e))?;
            Schema::from_field_names(headers)
        };

        debug!("Extracted {} fields: {:?}", schema.len(), schema.keys());
        Ok(schema)
    }

    /// Extract a schema from JSON text.
    pub fn from_json_str(text: &str) -> std::result::Result<Schema, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json_value(&value))
    }

    /// Extract a schema from an already parsed JSON document.
    pub fn from_json_value(value: &Value) -> Schema {
        match value {
            Value::Array(items) => match items.first() {
                Some(Value::Object(first)) => Schema::from_field_names(first.keys().cloned()),
                _ => Schema::new(),
            },
            Value::Object(map) => Schema::from_field_names(map.keys().cloned()),
            _ => Schema::new(),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn extraction_error(path: &Path, reason: impl ToString) -> ConversionError {
    ConversionError::Extraction {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_array_uses_first_element_keys() {
        let schema = SchemaExtractor::from_json_str(r#"[{"x": 1, "y": 2}, {"z": 3}]"#).unwrap();
        assert_eq!(schema.keys(), vec!["x", "y"]);
    }

    #[test]
    fn test_json_empty_array_gives_empty_schema() {
        let schema = SchemaExtractor::from_json_str("[]").unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_json_object_uses_top_level_keys() {
        let schema = SchemaExtractor::from_json_str(r#"{"p": 1}"#).unwrap();
        assert_eq!(schema.keys(), vec!["p"]);

        let schema = SchemaExtractor::from_json_str(r#"{"b": {"nested": 1}, "a": []}"#).unwrap();
        assert_eq!(schema.keys(), vec!["b", "a"]);
    }

    #[test]
    fn test_json_other_shapes_give_empty_schema() {
        assert!(SchemaExtractor::from_json_str("42").unwrap().is_empty());
        assert!(SchemaExtractor::from_json_str(r#""text""#).unwrap().is_empty());
        assert!(SchemaExtractor::from_json_str("[1, 2]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(SchemaExtractor::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_missing_file_is_extraction_error() {
        let err = SchemaExtractor::extract("does/not/exist.json").unwrap_err();
        assert_eq!(err.error_code(), "EXTRACTION_ERROR");

        let err = SchemaExtractor::extract("does/not/exist.xlsx").unwrap_err();
        assert_eq!(err.error_code(), "EXTRACTION_ERROR");
    }
}
