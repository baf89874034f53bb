//! Post-hoc quality classification of conversion results.
//!
//! Classification only annotates: every result lands in exactly one partition
//! with its 1-based row index, and the partitions borrow the results instead
//! of copying or altering them.

use crate::config::DEFAULT_NULL_DENSITY_THRESHOLD;
use crate::types::ConversionResult;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Why a result was flagged for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagReason {
    /// The row produced a failure record, or the object carries an `error` key.
    ParseError,
    /// More than the threshold share of the object's fields are empty.
    HighNullDensity { null_count: usize, total_keys: usize },
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError => f.write_str("Invalid JSON / Parsing Error"),
            Self::HighNullDensity {
                null_count,
                total_keys,
            } => write!(
                f,
                "High Null Density ({}/{} fields empty)",
                null_count, total_keys
            ),
        }
    }
}

impl Serialize for FlagReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Disposition attached to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Valid,
    Flagged(FlagReason),
}

/// A result annotated with its disposition and 1-based row index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedResult<'a> {
    pub index: usize,
    #[serde(skip)]
    pub disposition: Disposition,
    pub data: &'a ConversionResult,
}

/// Flagged entry as reported to the user: `{index, reason, data}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedResult<'a> {
    pub index: usize,
    pub reason: FlagReason,
    pub data: &'a ConversionResult,
}

/// Counts of a classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassificationSummary {
    pub total: usize,
    pub valid: usize,
    pub flagged: usize,
}

/// Both partitions, each in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification<'a> {
    pub valid: Vec<ClassifiedResult<'a>>,
    pub flagged: Vec<FlaggedResult<'a>>,
}

impl Classification<'_> {
    pub fn summary(&self) -> ClassificationSummary {
        ClassificationSummary {
            total: self.valid.len() + self.flagged.len(),
            valid: self.valid.len(),
            flagged: self.flagged.len(),
        }
    }
}

/// Splits results into valid and flagged partitions.
#[derive(Debug, Clone, Copy)]
pub struct ResultClassifier {
    null_density_threshold: f64,
}

impl Default for ResultClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_NULL_DENSITY_THRESHOLD)
    }
}

impl ResultClassifier {
    /// Objects with a null density strictly greater than `threshold` are
    /// flagged.
    pub fn new(null_density_threshold: f64) -> Self {
        Self {
            null_density_threshold,
        }
    }

    /// Classify a single result.
    ///
    /// Rules, first match wins:
    /// 1. error marker present: flagged as a parsing error
    /// 2. object with null density above the threshold: flagged
    /// 3. anything else, including arrays and scalars: valid
    pub fn disposition(&self, result: &ConversionResult) -> Disposition {
        if result.carries_error_marker() {
            return Disposition::Flagged(FlagReason::ParseError);
        }

        let Some(Value::Object(map)) = result.as_value() else {
            return Disposition::Valid;
        };

        let total_keys = map.len();
        if total_keys == 0 {
            return Disposition::Valid;
        }

        let null_count = map.values().filter(|v| is_empty_value(v)).count();
        if null_count as f64 / total_keys as f64 > self.null_density_threshold {
            Disposition::Flagged(FlagReason::HighNullDensity {
                null_count,
                total_keys,
            })
        } else {
            Disposition::Valid
        }
    }

    /// Classify a batch in a single pass.
    pub fn classify<'a>(&self, results: &'a [ConversionResult]) -> Classification<'a> {
        let mut classification = Classification::default();

        for (i, data) in results.iter().enumerate() {
            let index = i + 1;
            match self.disposition(data) {
                Disposition::Flagged(reason) => classification.flagged.push(FlaggedResult {
                    index,
                    reason,
                    data,
                }),
                disposition @ Disposition::Valid => {
                    classification.valid.push(ClassifiedResult {
                        index,
                        disposition,
                        data,
                    })
                }
            }
        }

        classification
    }
}

/// Null, empty string, or the string "null" in any case.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s.eq_ignore_ascii_case("null"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureRecord, Row};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn converted(value: Value) -> ConversionResult {
        ConversionResult::Converted(value)
    }

    #[test]
    fn test_mixed_batch() {
        let results = vec![
            converted(json!({"name": "Alice", "age": 30, "city": "NY"})),
            ConversionResult::Failed(FailureRecord::invalid_json("...", Row::default())),
            converted(json!({"name": "Bob", "age": null, "city": "", "country": "null"})),
            converted(json!({"name": "Charlie", "age": 25, "city": null, "country": ""})),
        ];

        let classification = ResultClassifier::default().classify(&results);

        assert_eq!(
            classification.summary(),
            ClassificationSummary {
                total: 4,
                valid: 2,
                flagged: 2
            }
        );
        assert_eq!(classification.flagged[0].index, 2);
        assert_eq!(classification.flagged[0].reason, FlagReason::ParseError);
        assert_eq!(classification.flagged[1].index, 3);
        assert_eq!(
            classification.flagged[1].reason.to_string(),
            "High Null Density (3/4 fields empty)"
        );
        let valid_indices: Vec<usize> = classification.valid.iter().map(|c| c.index).collect();
        assert_eq!(valid_indices, vec![1, 4]);
    }

    #[test]
    fn test_all_empty_object_is_flagged() {
        let result = converted(json!({"name": null, "age": "", "city": "NULL", "country": "null"}));
        assert_eq!(
            ResultClassifier::default().disposition(&result),
            Disposition::Flagged(FlagReason::HighNullDensity {
                null_count: 4,
                total_keys: 4
            })
        );
    }

    #[test]
    fn test_exactly_half_empty_is_valid() {
        let result = converted(json!({"name": "Charlie", "age": 25, "city": null, "country": ""}));
        assert_eq!(ResultClassifier::default().disposition(&result), Disposition::Valid);
    }

    #[test]
    fn test_error_key_wins_over_density() {
        let result = converted(json!({"error": "x", "a": 1, "b": 2, "c": 3}));
        assert_eq!(
            ResultClassifier::default().disposition(&result),
            Disposition::Flagged(FlagReason::ParseError)
        );
    }

    #[test]
    fn test_empty_object_is_valid() {
        assert_eq!(
            ResultClassifier::default().disposition(&converted(json!({}))),
            Disposition::Valid
        );
    }

    #[test]
    fn test_non_objects_are_valid() {
        let classifier = ResultClassifier::default();
        assert_eq!(classifier.disposition(&converted(json!([null, null]))), Disposition::Valid);
        assert_eq!(classifier.disposition(&converted(Value::Null)), Disposition::Valid);
        assert_eq!(classifier.disposition(&converted(json!("null"))), Disposition::Valid);
    }

    #[test]
    fn test_zero_and_false_are_not_empty() {
        let result = converted(json!({"a": 0, "b": false, "c": null}));
        assert_eq!(ResultClassifier::default().disposition(&result), Disposition::Valid);
    }

    #[test]
    fn test_custom_threshold() {
        let result = converted(json!({"a": 1, "b": null, "c": null, "d": 4}));
        assert_eq!(ResultClassifier::new(0.5).disposition(&result), Disposition::Valid);
        assert!(matches!(
            ResultClassifier::new(0.25).disposition(&result),
            Disposition::Flagged(FlagReason::HighNullDensity { .. })
        ));
    }

    #[test]
    fn test_classification_borrows_without_mutation() {
        let results = vec![converted(json!({"a": null, "b": null}))];
        let before = results.clone();
        let classification = ResultClassifier::default().classify(&results);

        assert!(std::ptr::eq(classification.flagged[0].data, &results[0]));
        assert_eq!(results, before);
    }

    #[test]
    fn test_flagged_entry_serialization() {
        let results = vec![converted(json!({"a": null}))];
        let classification = ResultClassifier::default().classify(&results);
        let value = serde_json::to_value(&classification.flagged[0]).unwrap();
        assert_eq!(
            value,
            json!({"index": 1, "reason": "High Null Density (1/1 fields empty)", "data": {"a": null}})
        );
    }
}
