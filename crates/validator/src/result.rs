//! Validation results: the data every outcome is reduced to.
//!
//! Failures are never errors here. A failed rule, a rejected async check
//! and a failed form-level check all end up as `valid: false` plus a
//! message.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use crate::rules::RuleKind;

/// Where a result sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationPhase {
    /// Computed synchronously; final.
    #[default]
    Immediate,
    /// Synchronous rules done, an async check is outstanding.
    #[serde(rename = "isValidating")]
    Validating,
    /// The async check settled; final.
    Done,
}

impl ValidationPhase {
    /// Returns true for phases that will not change again.
    #[must_use]
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Validating)
    }
}

/// Outcome of validating one field.
///
/// Created fresh on every validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    /// Whether every rule passed.
    pub valid: bool,
    /// Rules that failed, in declaration order.
    pub failed_rules: SmallVec<[RuleKind; 4]>,
    /// Message for the last failing rule, or empty.
    pub message: String,
    /// The value that was validated.
    pub current_value: Value,
    /// Whether an async rule took part.
    pub is_async: bool,
    /// Lifecycle phase.
    pub phase: ValidationPhase,
}

impl FieldResult {
    /// A passing result for `value` with no rules applied.
    #[must_use]
    pub fn valid(value: Value) -> Self {
        Self {
            valid: true,
            failed_rules: SmallVec::new(),
            message: String::new(),
            current_value: value,
            is_async: false,
            phase: ValidationPhase::Immediate,
        }
    }

    /// Records a failing rule.
    pub(crate) fn record_failure(&mut self, rule: RuleKind, message: String) {
        self.valid = false;
        self.failed_rules.push(rule);
        self.message = message;
    }
}

/// Outcome of validating a whole form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResult {
    /// Whether every field and form-level check passed.
    pub valid: bool,
    /// Whether async work took part.
    pub is_async: bool,
    /// Failure message, or empty.
    pub message: String,
    /// Lifecycle phase.
    pub phase: ValidationPhase,
}

impl FormResult {
    pub(crate) fn immediate(valid: bool, message: String) -> Self {
        Self {
            valid,
            is_async: false,
            message,
            phase: ValidationPhase::Immediate,
        }
    }

    pub(crate) fn validating() -> Self {
        Self {
            valid: true,
            is_async: true,
            message: String::new(),
            phase: ValidationPhase::Validating,
        }
    }

    pub(crate) fn done(valid: bool, message: String) -> Self {
        Self {
            valid,
            is_async: true,
            message,
            phase: ValidationPhase::Done,
        }
    }
}

/// Synchronous form outcome: the verdict plus the raw field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormReport {
    /// The form verdict.
    pub result: FormResult,
    /// Raw `name -> value` map of the validated form.
    pub values: IndexMap<String, Value>,
}

/// Why a deferred check was rejected.
///
/// Async handlers may reject with a message or silently; the message, when
/// present, becomes the failure message of the field or form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rejection {
    /// Optional human-readable reason.
    pub message: Option<String>,
}

impl Rejection {
    /// A rejection without a message.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// A rejection carrying a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl From<&str> for Rejection {
    fn from(message: &str) -> Self {
        Self::with_message(message)
    }
}

impl From<String> for Rejection {
    fn from(message: String) -> Self {
        Self::with_message(message)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "rejected: {message}"),
            None => f.write_str("rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn field_result_serializes_in_camel_case() {
        let mut result = FieldResult::valid(json!("15"));
        result.record_failure(RuleKind::MinLength, "Must be at least 3 characters".into());

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "valid": false,
                "failedRules": ["minLength"],
                "message": "Must be at least 3 characters",
                "currentValue": "15",
                "isAsync": false,
                "phase": "immediate",
            })
        );
    }

    #[test]
    fn validating_phase_uses_wire_name() {
        assert_eq!(
            serde_json::to_value(ValidationPhase::Validating).unwrap(),
            json!("isValidating")
        );
        assert!(!ValidationPhase::Validating.is_final());
        assert!(ValidationPhase::Done.is_final());
    }

    #[test]
    fn rejection_display() {
        assert_eq!(Rejection::from("server error").to_string(), "rejected: server error");
        assert_eq!(Rejection::silent().to_string(), "rejected");
    }
}
