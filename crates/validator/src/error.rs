//! Errors surfaced by the engine.
//!
//! Validation failures are not errors: they are results with
//! `valid: false`. The types here cover configuration problems found while
//! loading a model and caller misuse of the request API.

use crate::rules::RuleKind;

/// A problem found while turning a model document into a
/// [`ValidationModel`](crate::model::ValidationModel).
///
/// Only returned under [`RulePolicy::Strict`](crate::config::RulePolicy);
/// the lenient policy logs and skips instead, except for [`Malformed`]
/// documents, which are always rejected.
///
/// [`Malformed`]: ConfigError::Malformed
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The rule name is not in the catalog.
    #[error("field `{field}`: unknown rule `{rule}`")]
    UnknownRule {
        /// Field the rule was declared on.
        field: String,
        /// The unrecognized name.
        rule: String,
    },

    /// The rule parameter has the wrong shape.
    #[error("field `{field}`: rule `{rule}` expects {expected}")]
    InvalidParameter {
        /// Field the rule was declared on.
        field: String,
        /// The rule whose parameter is wrong.
        rule: RuleKind,
        /// What the parameter should have been.
        expected: &'static str,
    },

    /// A literal pattern failed to compile.
    #[error("field `{field}`: invalid pattern")]
    InvalidPattern {
        /// Field the pattern was declared on.
        field: String,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },

    /// A handler name does not match any registered handler.
    #[error("no handler registered under `{name}`")]
    UnregisteredHandler {
        /// The unresolved name.
        name: String,
    },

    /// The document is not a model at all.
    #[error("malformed model document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Caller misuse of the request API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The request named neither a field nor a form.
    #[error("request names neither a field nor a form")]
    EmptyRequest,

    /// The named field is not present in the form.
    #[error("field `{0}` is not present in the form")]
    FieldNotFound(String),
}
