//! JSON redaction with field-level overrides

use std::collections::HashSet;

use rdx_core::RulePattern;
use serde_json::{Map, Value};

use crate::text::TextRedactor;

/// Value written over a sensitive field, whatever its original type
pub const FIELD_SENTINEL: &str = "[REDACTED]";

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRedaction {
    pub value: Value,
    pub matches_found: usize,
}

/// Walks a JSON value, blacking out sensitive keys and running the text
/// rules over every other string leaf.
pub struct StructuredRedactor {
    text: TextRedactor,
    sensitive_fields: HashSet<String>,
}

impl StructuredRedactor {
    pub fn new(patterns: &[RulePattern], sensitive_fields: HashSet<String>) -> Self {
        Self {
            text: TextRedactor::new(patterns),
            sensitive_fields,
        }
    }

    pub fn patterns_applied(&self) -> usize {
        self.text.patterns_applied()
    }

    /// Build a redacted copy of `value`; the input is left as is
    pub fn redact(&self, value: &Value) -> StructuredRedaction {
        let mut matches_found = 0;
        let value = self.redact_value(value, &mut matches_found);
        StructuredRedaction {
            value,
            matches_found,
        }
    }

    fn redact_value(&self, value: &Value, matches: &mut usize) -> Value {
        match value {
            Value::Object(obj) => {
                let mut redacted = Map::with_capacity(obj.len());
                for (key, val) in obj {
                    let new_val = if self.sensitive_fields.contains(key) {
                        *matches += 1;
                        Value::String(FIELD_SENTINEL.to_string())
                    } else {
                        self.redact_value(val, matches)
                    };
                    redacted.insert(key.clone(), new_val);
                }
                Value::Object(redacted)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.redact_value(item, matches))
                    .collect(),
            ),
            Value::String(s) => {
                let result = self.text.redact(s);
                *matches += result.matches_found;
                Value::String(result.text)
            }
            // Numbers, bools, nulls pass through unchanged
            other => other.clone(),
        }
    }
}
