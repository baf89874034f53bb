//! Target schemas and how they are obtained.
//!
//! A [`Schema`] is an ordered list of target field names with a description
//! each. It comes either from a reference artifact ([`SchemaExtractor`]) or
//! from the model itself ([`SchemaInference`]). Inferred schemas start out as
//! [`SchemaState::Proposed`] and only drive a run once confirmed.

mod extractor;
mod inference;

pub use extractor::SchemaExtractor;
pub use inference::SchemaInference;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Description given to fields taken from a reference artifact.
pub const PLACEHOLDER_DESCRIPTION: &str = "Data Type/Description";

/// One target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub description: String,
}

/// Ordered mapping of target field name to description.
///
/// Serializes as a JSON object `{name: description}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema whose descriptions are all [`PLACEHOLDER_DESCRIPTION`].
    pub fn from_field_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(Self::new(), |schema, name| {
            schema.with_field(name, PLACEHOLDER_DESCRIPTION)
        })
    }

    /// Append a field. A repeated name keeps its first position and takes the
    /// new description.
    pub fn with_field(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let description = description.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.description = description,
            None => self.fields.push(SchemaField { name, description }),
        }
        self
    }

    /// Field names in order.
    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.description.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.description)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .fold(Schema::new(), |schema, (name, hint)| {
                schema.with_field(name, describe_hint(&hint))
            }))
    }
}

/// Render a type hint as a description string.
pub(crate) fn describe_hint(hint: &Value) -> String {
    match hint {
        Value::String(s) => s.clone(),
        Value::Null => PLACEHOLDER_DESCRIPTION.to_string(),
        other => other.to_string(),
    }
}

/// Lifecycle of the schema held by a job.
///
/// Reference-file schemas are confirmed when created. Inferred schemas are
/// proposed and need an explicit [`confirm`](Self::confirm).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaState {
    Proposed(Schema),
    Confirmed(Schema),
}

impl SchemaState {
    /// The schema, whatever its state.
    pub fn schema(&self) -> &Schema {
        match self {
            Self::Proposed(schema) | Self::Confirmed(schema) => schema,
        }
    }

    /// The schema, only once confirmed.
    pub fn confirmed(&self) -> Option<&Schema> {
        match self {
            Self::Confirmed(schema) => Some(schema),
            Self::Proposed(_) => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn confirm(self) -> Self {
        match self {
            Self::Proposed(schema) | Self::Confirmed(schema) => Self::Confirmed(schema),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_field_names_uses_placeholder() {
        let schema = Schema::from_field_names(["customer_name", "amount"]);
        assert_eq!(schema.keys(), vec!["customer_name", "amount"]);
        assert_eq!(schema.description("amount"), Some(PLACEHOLDER_DESCRIPTION));
    }

    #[test]
    fn test_repeated_field_keeps_position() {
        let schema = Schema::new()
            .with_field("a", "first")
            .with_field("b", "x")
            .with_field("a", "second");
        assert_eq!(schema.keys(), vec!["a", "b"]);
        assert_eq!(schema.description("a"), Some("second"));
    }

    #[test]
    fn test_schema_serializes_as_object() {
        let schema = Schema::new()
            .with_field("name", "string")
            .with_field("age", "integer");
        assert_eq!(
            serde_json::to_string(&schema).unwrap(),
            r#"{"name":"string","age":"integer"}"#
        );
    }

    #[test]
    fn test_schema_deserializes_hints() {
        let schema: Schema =
            serde_json::from_value(json!({"name": "string", "tags": ["a"], "note": null})).unwrap();
        assert_eq!(schema.keys(), vec!["name", "tags", "note"]);
        assert_eq!(schema.description("tags"), Some(r#"["a"]"#));
        assert_eq!(schema.description("note"), Some(PLACEHOLDER_DESCRIPTION));
    }

    #[test]
    fn test_schema_state_confirmation() {
        let state = SchemaState::Proposed(Schema::from_field_names(["x"]));
        assert!(!state.is_confirmed());
        assert!(state.confirmed().is_none());
        assert_eq!(state.schema().keys(), vec!["x"]);

        let state = state.confirm();
        assert!(state.is_confirmed());
        assert_eq!(state.confirmed().map(Schema::len), Some(1));
    }
}
