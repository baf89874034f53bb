//! Prompt templates.
//!
//! Both builders are pure: the same inputs always give the same prompt.

use crate::types::Row;
use serde_json::Value;

/// System message sent by chat-style backends.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful data conversion assistant that outputs only JSON.";

/// Renders conversion and schema-inference prompts.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt asking the model to convert one row into an object restricted to
    /// `schema_keys`.
    pub fn conversion_prompt<S: AsRef<str>>(row: &Row, schema_keys: &[S]) -> String {
        format!(
            "You are a data conversion assistant.\n\
            Convert the following input data into a JSON object based on the provided target schema keys.\n\n\
            Input Data:\n{}\n\n\
            Target Schema Keys (The output JSON must strictly use these keys):\n{}\n\n\
            Return ONLY the valid JSON object. Do not include any explanation or markdown formatting like ```json.",
            row,
            key_list(schema_keys)
        )
    }

    /// Prompt asking the model to propose a target schema from sample rows.
    pub fn schema_inference_prompt(sample_rows: &[Row]) -> String {
        let mut prompt = String::from(
            "You are a data modelling assistant.\n\
            Analyze the following sample records and propose a clean target schema for them.\n\n\
            Sample Records:\n",
        );

        for (i, row) in sample_rows.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, row));
        }

        prompt.push_str(
            "\nReturn ONLY a JSON object whose keys are the proposed field names (snake_case) \
            and whose values are short descriptions of each field's data type.\n\
            Example: {\"customer_name\": \"string - full name of the customer\", \"amount\": \"number\"}\n\
            Do not include any explanation or markdown formatting like ```json.",
        );

        prompt
    }
}

fn key_list<S: AsRef<str>>(keys: &[S]) -> String {
    Value::Array(
        keys.iter()
            .map(|k| Value::String(k.as_ref().to_owned()))
            .collect(),
    )
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_row() -> Row {
        Row::from_pairs([
            ("raw_description", json!("John Doe purchased a MacBook Pro for $2500")),
            ("transaction_id", json!("TX1001")),
        ])
    }

    #[test]
    fn test_conversion_prompt_embeds_row_and_keys() {
        let prompt = PromptBuilder::conversion_prompt(&sample_row(), &["customer_name", "amount"]);

        assert!(prompt.contains(r#""transaction_id":"TX1001""#));
        assert!(prompt.contains(r#"["customer_name","amount"]"#));
        assert!(prompt.contains("Return ONLY the valid JSON object"));
    }

    #[test]
    fn test_conversion_prompt_is_deterministic() {
        let keys = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            PromptBuilder::conversion_prompt(&sample_row(), &keys),
            PromptBuilder::conversion_prompt(&sample_row(), &keys)
        );
    }

    #[test]
    fn test_key_list_escapes_quotes() {
        assert_eq!(key_list(&["say \"hi\""]), r#"["say \"hi\""]"#);
    }

    #[test]
    fn test_schema_inference_prompt_numbers_rows() {
        let rows = vec![
            Row::from_pairs([("name", json!("Alice")), ("age", json!(30))]),
            Row::from_pairs([("name", json!("Bob")), ("age", json!(25))]),
        ];

        let prompt = PromptBuilder::schema_inference_prompt(&rows);
        assert!(prompt.contains(r#"1. {"name":"Alice","age":30}"#));
        assert!(prompt.contains(r#"2. {"name":"Bob","age":25}"#));
        assert!(prompt.contains("Return ONLY a JSON object"));
    }
}
