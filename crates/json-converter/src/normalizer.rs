//! Recovery of JSON payloads from raw completions.
//!
//! Models often wrap their answer in markdown fences or add prose around it.
//! The normalizer takes the content of the first fenced block (preferring a
//! block opened with "```json"), falls back to the whole text, and parses it
//! strictly.
//!
//! Only the first fence pair is used. A response with several blocks keeps
//! the first one and silently ignores the rest.

use crate::error::ParseError;
use crate::types::{ConversionResult, FailureRecord, RawCompletion, Row};
use serde_json::Value;
use tracing::{debug, warn};

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Strips fencing from completions and parses them as JSON.
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    /// Text the parser should see.
    ///
    /// - Contains "```json": the text after the first "```json" up to the
    ///   next "```" (or the end of the text).
    /// - Else contains "```": the text between the first and second fence (or
    ///   to the end of the text).
    /// - Else: `raw` unchanged.
    pub fn strip_fences(raw: &str) -> &str {
        let inner = if let Some((_, after)) = raw.split_once(JSON_FENCE) {
            after.split(FENCE).next().unwrap_or(after)
        } else if raw.contains(FENCE) {
            raw.split(FENCE).nth(1).unwrap_or_default()
        } else {
            return raw;
        };
        inner.trim()
    }

    /// Strip fences and parse strictly.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] holding the parser message and the raw,
    /// pre-stripped text.
    pub fn parse(raw: &str) -> Result<Value, ParseError> {
        serde_json::from_str(Self::strip_fences(raw)).map_err(|e| ParseError {
            message: e.to_string(),
            raw_output: raw.to_string(),
        })
    }

    /// Turn a completion into the outcome for `input`.
    ///
    /// Never fails: unparsable output becomes a [`FailureRecord`] carrying
    /// the raw text and the originating row.
    pub fn normalize(raw: &RawCompletion, input: &Row) -> ConversionResult {
        match Self::parse(raw.as_str()) {
            Ok(value) => ConversionResult::Converted(value),
            Err(e) => {
                if raw.is_backend_error() {
                    warn!("Backend failure recorded as row failure: {}", raw);
                } else {
                    debug!("Completion is not valid JSON: {}", e.message);
                }
                ConversionResult::Failed(FailureRecord::invalid_json(e.raw_output, input.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row() -> Row {
        Row::from_pairs([("id", json!("TX1001"))])
    }

    // -------------------------------------------------------------------------
    // strip_fences
    // -------------------------------------------------------------------------

    #[test]
    fn test_json_fence_is_stripped() {
        assert_eq!(ResponseNormalizer::strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_plain_fence_is_stripped() {
        assert_eq!(ResponseNormalizer::strip_fences("```\n[1, 2]\n```"), "[1, 2]");
    }

    #[test]
    fn test_prose_around_json_fence() {
        let raw = "Sure! Here is the object:\n```json\n{\"a\": 1}\n```\nLet me know.";
        assert_eq!(ResponseNormalizer::strip_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_first_block_wins() {
        let raw = "```json\n{\"first\": 1}\n```\n```json\n{\"second\": 2}\n```";
        assert_eq!(ResponseNormalizer::strip_fences(raw), "{\"first\": 1}");

        let raw = "```\n{\"first\": 1}\n```\ntext\n```\n{\"second\": 2}\n```";
        assert_eq!(ResponseNormalizer::strip_fences(raw), "{\"first\": 1}");
    }

    #[test]
    fn test_json_fence_preferred_over_earlier_plain_fence() {
        let raw = "```\nnotes\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(ResponseNormalizer::strip_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_unclosed_fence_takes_rest_of_text() {
        assert_eq!(ResponseNormalizer::strip_fences("```json\n{\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_no_fence_is_unchanged() {
        let raw = "  {\"a\": 1}  ";
        assert_eq!(ResponseNormalizer::strip_fences(raw), raw);
    }

    // -------------------------------------------------------------------------
    // parse / normalize
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_fenced_object() {
        let value = ResponseNormalizer::parse("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_parse_clean_json_matches_strict_parse() {
        for raw in [r#"{"a": 1, "b": [true, null]}"#, "[1, 2, 3]", "\"text\"", "42"] {
            let strict: Value = serde_json::from_str(raw).unwrap();
            assert_eq!(ResponseNormalizer::parse(raw).unwrap(), strict);
        }
    }

    #[test]
    fn test_parse_keeps_key_order() {
        let value = ResponseNormalizer::parse(r#"{"zeta": 1, "alpha": 2}"#).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_parse_error_keeps_raw_text() {
        let raw = "I could not find any structured data in this record.";
        let err = ResponseNormalizer::parse(raw).unwrap_err();
        assert_eq!(err.raw_output, raw);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_parse_error_keeps_pre_stripped_text() {
        let raw = "```json\n{broken\n```";
        let err = ResponseNormalizer::parse(raw).unwrap_err();
        assert_eq!(err.raw_output, raw);
    }

    #[test]
    fn test_normalize_success() {
        let result = ResponseNormalizer::normalize(&RawCompletion::new("{\"name\": \"Ann\"}"), &row());
        assert_eq!(result, ConversionResult::Converted(json!({"name": "Ann"})));
    }

    #[test]
    fn test_normalize_failure_keeps_provenance() {
        let raw = RawCompletion::new("no json here");
        let result = ResponseNormalizer::normalize(&raw, &row());

        match result {
            ConversionResult::Failed(record) => {
                assert_eq!(record.error, "Invalid JSON");
                assert_eq!(record.raw_output, "no json here");
                assert_eq!(record.input, row());
            }
            other => panic!("expected failure record, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_backend_error_marker() {
        let raw = RawCompletion::new("Error: connection refused");
        let result = ResponseNormalizer::normalize(&raw, &row());
        assert!(result.is_failure());
    }
}
