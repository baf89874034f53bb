//! Per-job state.

use crate::schema::{Schema, SchemaState};

/// Everything a run needs besides the rows and the backend: the target
/// schema and the chosen model.
///
/// A job created from a reference artifact is confirmed immediately. A job
/// created from an inferred schema starts as proposed and the pipeline
/// refuses it until [`confirm_schema`](Self::confirm_schema) is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    schema: SchemaState,
    model: String,
}

impl JobContext {
    /// Job with an already confirmed schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema: SchemaState::Confirmed(schema),
            model: String::new(),
        }
    }

    /// Job whose schema still needs confirmation.
    pub fn proposed(schema: Schema) -> Self {
        Self {
            schema: SchemaState::Proposed(schema),
            model: String::new(),
        }
    }

    /// Job from an existing schema state.
    pub fn from_state(schema: SchemaState) -> Self {
        Self {
            schema,
            model: String::new(),
        }
    }

    /// Set the model identifier. Blank means the backend's default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn confirm_schema(mut self) -> Self {
        self.schema = self.schema.confirm();
        self
    }

    /// The schema, only once confirmed.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.confirmed()
    }

    pub fn schema_state(&self) -> &SchemaState {
        &self.schema
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_schema_is_confirmed() {
        let job = JobContext::with_schema(Schema::from_field_names(["a"])).with_model("llama2");
        assert!(job.schema().is_some());
        assert_eq!(job.model(), "llama2");
    }

    #[test]
    fn test_proposed_schema_needs_confirmation() {
        let job = JobContext::proposed(Schema::from_field_names(["a", "b"]));
        assert!(job.schema().is_none());
        assert_eq!(job.schema_state().schema().len(), 2);

        let job = job.confirm_schema();
        assert_eq!(job.schema().map(|s| s.keys()), Some(vec!["a", "b"]));
    }
}
