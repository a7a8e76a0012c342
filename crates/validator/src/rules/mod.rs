//! Rules: the closed set of checks a field can be configured with.
//!
//! Rule names are resolved into [`Rule`] values when a model is built or
//! loaded, so evaluation never dispatches on strings. Each rule carries its
//! parameter in typed form; callables (`func`, `async`) are either bound
//! handlers or the raw parameter that failed to resolve to one.

pub mod catalog;
pub mod pattern;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::{SmallVec, smallvec};

use crate::deferred::Settler;
use crate::result::Rejection;

pub use catalog::{RuleCatalog, RuleInput, Verdict};
pub use pattern::{Pattern, PatternSet};

// ============================================================================
// RULE KIND
// ============================================================================

/// Name of a rule, as written in model documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    /// Value must be filled in; a group needs one checked member.
    Required,
    /// Caller-supplied predicate.
    Func,
    /// Caller-supplied deferred check.
    Async,
    /// Value must be an accepting boolean.
    Acceptance,
    /// Group must have at least N checked members.
    MinChecked,
    /// Group must have at most N checked members.
    MaxChecked,
    /// Numeric upper bound.
    Max,
    /// Numeric lower bound.
    Min,
    /// Numeric inclusive range.
    Range,
    /// Exact string length.
    Length,
    /// Minimum string length.
    MinLength,
    /// Maximum string length.
    MaxLength,
    /// Inclusive string length range.
    RangeLength,
    /// Value must loosely equal one of the listed values.
    OneOf,
    /// Value must equal another field's value.
    EqualTo,
    /// Value must match a named or literal pattern.
    Pattern,
}

impl RuleKind {
    /// Every rule kind, in catalog order.
    pub const ALL: [Self; 16] = [
        Self::Required,
        Self::Func,
        Self::Async,
        Self::Acceptance,
        Self::MinChecked,
        Self::MaxChecked,
        Self::Max,
        Self::Min,
        Self::Range,
        Self::Length,
        Self::MinLength,
        Self::MaxLength,
        Self::RangeLength,
        Self::OneOf,
        Self::EqualTo,
        Self::Pattern,
    ];

    /// Name used in model documents and message catalogs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Func => "func",
            Self::Async => "async",
            Self::Acceptance => "acceptance",
            Self::MinChecked => "minChecked",
            Self::MaxChecked => "maxChecked",
            Self::Max => "max",
            Self::Min => "min",
            Self::Range => "range",
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::RangeLength => "rangeLength",
            Self::OneOf => "oneOf",
            Self::EqualTo => "equalTo",
            Self::Pattern => "pattern",
        }
    }

    /// Looks a rule kind up by its document name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CALLABLE PARAMETERS
// ============================================================================

/// What a `func` predicate returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The check passed.
    Pass,
    /// The check failed without a message of its own.
    Fail,
    /// The check failed with its own message.
    Message(String),
}

impl From<bool> for RuleOutcome {
    fn from(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }
}

impl From<String> for RuleOutcome {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for RuleOutcome {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

/// Predicate bound to a `func` rule.
pub type Predicate = Arc<dyn Fn(&Value) -> RuleOutcome + Send + Sync>;

/// Handler bound to an `async` rule.
///
/// The handler must eventually resolve or reject the settler it is given;
/// it may keep the settler and do so long after it returns.
pub type AsyncCheck = Arc<dyn Fn(&Value, Settler<(), Rejection>) + Send + Sync>;

/// A callable rule parameter.
#[derive(Clone)]
pub enum Callable<F> {
    /// A handler the rule can invoke.
    Bound(F),
    /// The configured parameter was not a handler.
    Unbound(Value),
}

impl<F> fmt::Debug for Callable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bound(_) => f.write_str("Bound(<function>)"),
            Self::Unbound(raw) => f.debug_tuple("Unbound").field(raw).finish(),
        }
    }
}

// ============================================================================
// RULE
// ============================================================================

/// A rule with its parameter.
#[derive(Debug, Clone)]
pub enum Rule {
    /// See [`RuleKind::Required`].
    Required,
    /// See [`RuleKind::Func`].
    Func(Callable<Predicate>),
    /// See [`RuleKind::Async`].
    Async(Callable<AsyncCheck>),
    /// See [`RuleKind::Acceptance`].
    Acceptance,
    /// See [`RuleKind::MinChecked`].
    MinChecked(usize),
    /// See [`RuleKind::MaxChecked`].
    MaxChecked(usize),
    /// See [`RuleKind::Max`].
    Max(f64),
    /// See [`RuleKind::Min`].
    Min(f64),
    /// See [`RuleKind::Range`].
    Range(f64, f64),
    /// See [`RuleKind::Length`].
    Length(usize),
    /// See [`RuleKind::MinLength`].
    MinLength(usize),
    /// See [`RuleKind::MaxLength`].
    MaxLength(usize),
    /// See [`RuleKind::RangeLength`].
    RangeLength(usize, usize),
    /// See [`RuleKind::OneOf`].
    OneOf(Vec<Value>),
    /// See [`RuleKind::EqualTo`].
    EqualTo(String),
    /// See [`RuleKind::Pattern`].
    Pattern(Pattern),
}

impl Rule {
    /// A `func` rule bound to `predicate`.
    ///
    /// ```
    /// use formguard_validator::rules::Rule;
    ///
    /// let even = Rule::func(|v| v.as_i64().is_some_and(|n| n % 2 == 0));
    /// let named = Rule::func(|v| if v.is_string() { Ok(()) } else { Err("Must be text") });
    /// # let _ = (even, named);
    /// ```
    pub fn func<F, R>(predicate: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: IntoRuleOutcome,
    {
        Self::Func(Callable::Bound(Arc::new(move |value| {
            predicate(value).into_rule_outcome()
        })))
    }

    /// An `async` rule bound to `check`.
    pub fn async_check<F>(check: F) -> Self
    where
        F: Fn(&Value, Settler<(), Rejection>) + Send + Sync + 'static,
    {
        Self::Async(Callable::Bound(Arc::new(check)))
    }

    /// The rule's kind.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Required => RuleKind::Required,
            Self::Func(_) => RuleKind::Func,
            Self::Async(_) => RuleKind::Async,
            Self::Acceptance => RuleKind::Acceptance,
            Self::MinChecked(_) => RuleKind::MinChecked,
            Self::MaxChecked(_) => RuleKind::MaxChecked,
            Self::Max(_) => RuleKind::Max,
            Self::Min(_) => RuleKind::Min,
            Self::Range(..) => RuleKind::Range,
            Self::Length(_) => RuleKind::Length,
            Self::MinLength(_) => RuleKind::MinLength,
            Self::MaxLength(_) => RuleKind::MaxLength,
            Self::RangeLength(..) => RuleKind::RangeLength,
            Self::OneOf(_) => RuleKind::OneOf,
            Self::EqualTo(_) => RuleKind::EqualTo,
            Self::Pattern(_) => RuleKind::Pattern,
        }
    }

    /// The parameter rendered for message templates, one entry per element.
    #[must_use]
    pub fn message_args(&self) -> SmallVec<[String; 2]> {
        match self {
            Self::Required | Self::Acceptance => smallvec!["true".to_owned()],
            Self::Func(_) | Self::Async(_) => SmallVec::new(),
            Self::MinChecked(n)
            | Self::MaxChecked(n)
            | Self::Length(n)
            | Self::MinLength(n)
            | Self::MaxLength(n) => smallvec![n.to_string()],
            Self::Max(bound) | Self::Min(bound) => smallvec![bound.to_string()],
            Self::Range(lo, hi) => smallvec![lo.to_string(), hi.to_string()],
            Self::RangeLength(lo, hi) => smallvec![lo.to_string(), hi.to_string()],
            Self::OneOf(options) => options.iter().map(crate::value::to_display).collect(),
            Self::EqualTo(other) => smallvec![other.clone()],
            Self::Pattern(pattern) => smallvec![pattern.as_str().to_owned()],
        }
    }
}

/// Conversion for `func` predicate return values.
///
/// `bool` maps to pass / fail, a string is a failure message, and
/// `Result<(), impl Into<String>>` maps `Err` to a failure message.
pub trait IntoRuleOutcome {
    /// Performs the conversion.
    fn into_rule_outcome(self) -> RuleOutcome;
}

impl IntoRuleOutcome for RuleOutcome {
    fn into_rule_outcome(self) -> RuleOutcome {
        self
    }
}

impl IntoRuleOutcome for bool {
    fn into_rule_outcome(self) -> RuleOutcome {
        self.into()
    }
}

impl IntoRuleOutcome for String {
    fn into_rule_outcome(self) -> RuleOutcome {
        RuleOutcome::Message(self)
    }
}

impl IntoRuleOutcome for &str {
    fn into_rule_outcome(self) -> RuleOutcome {
        RuleOutcome::Message(self.to_owned())
    }
}

impl<M: Into<String>> IntoRuleOutcome for Result<(), M> {
    fn into_rule_outcome(self) -> RuleOutcome {
        match self {
            Ok(()) => RuleOutcome::Pass,
            Err(message) => RuleOutcome::Message(message.into()),
        }
    }
}
