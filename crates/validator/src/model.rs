//! Validation models and how they are loaded.
//!
//! A [`ValidationModel`] is built either in code, through
//! [`ValidationModel::builder`], or from a JSON document through a
//! [`ModelLoader`]. Loading resolves every rule name into a [`Rule`] and
//! every handler name against a [`Handlers`] registry, so nothing is
//! looked up by string once validation starts.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::config::RulePolicy;
use crate::deferred::Settler;
use crate::error::ConfigError;
use crate::result::Rejection;
use crate::rules::{
    AsyncCheck, Callable, IntoRuleOutcome, PatternSet, Predicate, Rule, RuleKind,
};
use crate::source::ValueSource;
use crate::value::as_number;

/// Key of the custom message inside a field's rule map.
const MESSAGE_KEY: &str = "message";

/// Verdict of a model-level synchronous check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormCheck {
    /// Whether the form passed.
    pub valid: bool,
    /// Message reported when it did not.
    pub error_message: Option<String>,
}

impl FormCheck {
    /// A passing check.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            valid: true,
            error_message: None,
        }
    }

    /// A failing check with a message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error_message: Some(message.into()),
        }
    }
}

impl From<bool> for FormCheck {
    fn from(valid: bool) -> Self {
        Self {
            valid,
            error_message: None,
        }
    }
}

impl<M: Into<String>> From<Result<(), M>> for FormCheck {
    fn from(result: Result<(), M>) -> Self {
        match result {
            Ok(()) => Self::pass(),
            Err(message) => Self::fail(message),
        }
    }
}

/// Model-level synchronous check.
pub type FormCheckFn = Arc<dyn Fn(&dyn ValueSource) -> FormCheck + Send + Sync>;

/// Model-level asynchronous check. Must eventually settle the settler.
pub type FormAsyncCheck = Arc<dyn Fn(&dyn ValueSource, Settler<(), Rejection>) + Send + Sync>;

// ============================================================================
// FIELD MODEL
// ============================================================================

/// Rules for one field plus an optional custom message.
///
/// Rules keep declaration order; adding a rule of a kind already present
/// replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct FieldModel {
    rules: Vec<Rule>,
    message: Option<String>,
}

impl FieldModel {
    /// An empty field model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use = "builder methods must be chained or built"]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.push(rule);
        self
    }

    /// Sets the custom failure message.
    #[must_use = "builder methods must be chained or built"]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn push(&mut self, rule: Rule) {
        match self.rules.iter_mut().find(|r| r.kind() == rule.kind()) {
            Some(slot) => *slot = rule,
            None => self.rules.push(rule),
        }
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The custom message, if set.
    pub fn custom_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true if any rule is asynchronous.
    pub fn has_async(&self) -> bool {
        self.rules.iter().any(|r| r.kind() == RuleKind::Async)
    }
}

// ============================================================================
// VALIDATION MODEL
// ============================================================================

/// A named collection of field models plus optional form-level checks.
///
/// Read-only once built; share it behind an `Arc`.
#[derive(Clone)]
pub struct ValidationModel {
    name: String,
    fields: IndexMap<String, FieldModel>,
    validate: Option<FormCheckFn>,
    validate_async: Option<FormAsyncCheck>,
    error_message: Option<String>,
}

impl ValidationModel {
    /// Starts building a model called `name`.
    pub fn builder(name: impl Into<String>) -> ValidationModelBuilder {
        ValidationModelBuilder {
            model: Self {
                name: name.into(),
                fields: IndexMap::new(),
                validate: None,
                validate_async: None,
                error_message: None,
            },
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field model for `name`.
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.get(name)
    }

    /// Names of configured fields, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns true when no field is configured.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The model-level synchronous check.
    pub fn form_check(&self) -> Option<&FormCheckFn> {
        self.validate.as_ref()
    }

    /// The model-level asynchronous check.
    pub fn form_async_check(&self) -> Option<&FormAsyncCheck> {
        self.validate_async.as_ref()
    }

    /// Fallback message for a failed form.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl fmt::Debug for ValidationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationModel")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("validate", &self.validate.is_some())
            .field("validate_async", &self.validate_async.is_some())
            .field("error_message", &self.error_message)
            .finish()
    }
}

/// Builder for [`ValidationModel`].
///
/// ```
/// use formguard_validator::model::{FieldModel, ValidationModel};
/// use formguard_validator::rules::Rule;
///
/// let model = ValidationModel::builder("signup")
///     .field("age", FieldModel::new().rule(Rule::Required).rule(Rule::Min(18.0)))
///     .error_message("Please fix the form")
///     .build();
///
/// assert_eq!(model.field("age").unwrap().rules().len(), 2);
/// ```
#[derive(Debug)]
pub struct ValidationModelBuilder {
    model: ValidationModel,
}

impl ValidationModelBuilder {
    /// Adds (or replaces) a field model.
    pub fn field(mut self, name: impl Into<String>, field: FieldModel) -> Self {
        self.model.fields.insert(name.into(), field);
        self
    }

    /// Sets the model-level synchronous check.
    pub fn validate<F, C>(mut self, check: F) -> Self
    where
        F: Fn(&dyn ValueSource) -> C + Send + Sync + 'static,
        C: Into<FormCheck>,
    {
        self.model.validate = Some(Arc::new(move |form| check(form).into()));
        self
    }

    /// Sets the model-level asynchronous check.
    pub fn validate_async<F>(mut self, check: F) -> Self
    where
        F: Fn(&dyn ValueSource, Settler<(), Rejection>) + Send + Sync + 'static,
    {
        self.model.validate_async = Some(Arc::new(check));
        self
    }

    /// Sets the fallback message for a failed form.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.model.error_message = Some(message.into());
        self
    }

    /// Finishes the model.
    pub fn build(self) -> ValidationModel {
        self.model
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Named callables that model documents refer to.
#[derive(Clone, Default)]
pub struct Handlers {
    predicates: HashMap<String, Predicate>,
    async_checks: HashMap<String, AsyncCheck>,
    form_checks: HashMap<String, FormCheckFn>,
    form_async_checks: HashMap<String, FormAsyncCheck>,
}

impl Handlers {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `func` predicate.
    pub fn predicate<F, R>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: IntoRuleOutcome,
    {
        self.predicates.insert(
            name.into(),
            Arc::new(move |value| predicate(value).into_rule_outcome()),
        );
        self
    }

    /// Registers an `async` check.
    pub fn async_check<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, Settler<(), Rejection>) + Send + Sync + 'static,
    {
        self.async_checks.insert(name.into(), Arc::new(check));
        self
    }

    /// Registers a model-level synchronous check.
    pub fn form_check<F, C>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&dyn ValueSource) -> C + Send + Sync + 'static,
        C: Into<FormCheck>,
    {
        self.form_checks
            .insert(name.into(), Arc::new(move |form| check(form).into()));
        self
    }

    /// Registers a model-level asynchronous check.
    pub fn form_async_check<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&dyn ValueSource, Settler<(), Rejection>) + Send + Sync + 'static,
    {
        self.form_async_checks.insert(name.into(), Arc::new(check));
        self
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .field("async_checks", &self.async_checks.keys().collect::<Vec<_>>())
            .field("form_checks", &self.form_checks.keys().collect::<Vec<_>>())
            .field(
                "form_async_checks",
                &self.form_async_checks.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ============================================================================
// LOADER
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModel {
    #[serde(default)]
    name: String,
    #[serde(default)]
    data: IndexMap<String, RawField>,
    validate: Option<String>,
    validate_async: Option<String>,
    validate_error_message: Option<String>,
}

#[derive(Deserialize)]
struct RawField {
    validate: Option<IndexMap<String, Value>>,
}

/// Turns JSON model documents into [`ValidationModel`]s.
///
/// # Examples
///
/// ```
/// use formguard_validator::model::{Handlers, ModelLoader};
/// use serde_json::json;
///
/// let loader = ModelLoader::new(Handlers::new());
/// let model = loader
///     .load(&json!({
///         "name": "signup",
///         "data": { "age": { "validate": { "required": true, "min": 18 } } }
///     }))
///     .unwrap();
///
/// assert_eq!(model.name(), "signup");
/// assert_eq!(model.field("age").unwrap().rules().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelLoader {
    patterns: PatternSet,
    policy: RulePolicy,
    handlers: Handlers,
}

impl ModelLoader {
    /// Loader with built-in patterns and the lenient policy.
    pub fn new(handlers: Handlers) -> Self {
        Self {
            patterns: PatternSet::builtin(),
            policy: RulePolicy::Lenient,
            handlers,
        }
    }

    /// Uses `patterns` to resolve `pattern` parameters.
    pub fn with_patterns(mut self, patterns: PatternSet) -> Self {
        self.patterns = patterns;
        self
    }

    /// Sets the rule policy.
    pub fn with_policy(mut self, policy: RulePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Loads a model from a JSON string.
    pub fn load_str(&self, document: &str) -> Result<ValidationModel, ConfigError> {
        let raw: RawModel = serde_json::from_str(document)?;
        self.build(raw)
    }

    /// Loads a model from a JSON value.
    pub fn load(&self, document: &Value) -> Result<ValidationModel, ConfigError> {
        let raw = RawModel::deserialize(document)?;
        self.build(raw)
    }

    fn build(&self, raw: RawModel) -> Result<ValidationModel, ConfigError> {
        let mut model = ValidationModel::builder(raw.name).build();

        for (field, raw_field) in raw.data {
            let Some(rules) = raw_field.validate else {
                tracing::debug!(field = %field, "field has no rules, not validated");
                continue;
            };
            let field_model = self.field_model(&field, rules)?;
            model.fields.insert(field, field_model);
        }

        if let Some(name) = raw.validate {
            model.validate = self.lookup(&name, &self.handlers.form_checks)?;
        }
        if let Some(name) = raw.validate_async {
            model.validate_async = self.lookup(&name, &self.handlers.form_async_checks)?;
        }
        model.error_message = raw.validate_error_message;

        tracing::debug!(
            model = %model.name,
            fields = model.fields.len(),
            "validation model loaded"
        );
        Ok(model)
    }

    fn field_model(
        &self,
        field: &str,
        rules: IndexMap<String, Value>,
    ) -> Result<FieldModel, ConfigError> {
        let mut model = FieldModel::new();
        for (name, parameter) in rules {
            if name == MESSAGE_KEY {
                match parameter {
                    Value::String(message) => model.message = Some(message),
                    other => tracing::warn!(
                        field,
                        message = %other,
                        "custom message is not a string, ignored"
                    ),
                }
                continue;
            }
            match self.parse_rule(field, &name, &parameter) {
                Ok(Some(rule)) => model.push(rule),
                Ok(None) => tracing::debug!(field, rule = %name, "rule disabled"),
                Err(error) if self.policy == RulePolicy::Lenient => {
                    tracing::warn!(field, rule = %name, %error, "rule skipped");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(model)
    }

    fn parse_rule(
        &self,
        field: &str,
        name: &str,
        parameter: &Value,
    ) -> Result<Option<Rule>, ConfigError> {
        let Some(kind) = RuleKind::from_name(name) else {
            return Err(ConfigError::UnknownRule {
                field: field.to_owned(),
                rule: name.to_owned(),
            });
        };
        let invalid = |expected: &'static str| ConfigError::InvalidParameter {
            field: field.to_owned(),
            rule: kind,
            expected,
        };

        let rule = match kind {
            // The parameter is not read; only a literal `false` opts out.
            RuleKind::Required | RuleKind::Acceptance if parameter == &Value::Bool(false) => {
                return Ok(None);
            }
            RuleKind::Required => Rule::Required,
            RuleKind::Acceptance => Rule::Acceptance,
            RuleKind::Func => Rule::Func(self.callable(parameter, &self.handlers.predicates)?),
            RuleKind::Async => Rule::Async(self.callable(parameter, &self.handlers.async_checks)?),
            RuleKind::Min => Rule::Min(as_number(parameter).ok_or_else(|| invalid("a number"))?),
            RuleKind::Max => Rule::Max(as_number(parameter).ok_or_else(|| invalid("a number"))?),
            RuleKind::Range => {
                let (lo, hi) = pair(parameter, as_number)
                    .ok_or_else(|| invalid("a two-element numeric array"))?;
                Rule::Range(lo, hi)
            }
            RuleKind::Length
            | RuleKind::MinLength
            | RuleKind::MaxLength
            | RuleKind::MinChecked
            | RuleKind::MaxChecked => {
                let n = count(parameter).ok_or_else(|| invalid("a non-negative integer"))?;
                match kind {
                    RuleKind::Length => Rule::Length(n),
                    RuleKind::MinLength => Rule::MinLength(n),
                    RuleKind::MaxLength => Rule::MaxLength(n),
                    RuleKind::MinChecked => Rule::MinChecked(n),
                    _ => Rule::MaxChecked(n),
                }
            }
            RuleKind::RangeLength => {
                let (lo, hi) = pair(parameter, count)
                    .ok_or_else(|| invalid("a two-element array of non-negative integers"))?;
                Rule::RangeLength(lo, hi)
            }
            RuleKind::OneOf => match parameter {
                Value::Array(options) => Rule::OneOf(options.clone()),
                _ => return Err(invalid("an array")),
            },
            RuleKind::EqualTo => match parameter {
                Value::String(other) => Rule::EqualTo(other.clone()),
                _ => return Err(invalid("a field name")),
            },
            RuleKind::Pattern => {
                let source = parameter.as_str().ok_or_else(|| invalid("a pattern string"))?;
                let pattern =
                    self.patterns
                        .resolve(source)
                        .map_err(|source| ConfigError::InvalidPattern {
                            field: field.to_owned(),
                            source,
                        })?;
                Rule::Pattern(pattern)
            }
        };
        Ok(Some(rule))
    }

    /// Binds a rule handler by name. Unresolved names stay unbound unless
    /// the policy is strict.
    fn callable<F: Clone>(
        &self,
        parameter: &Value,
        registry: &HashMap<String, F>,
    ) -> Result<Callable<F>, ConfigError> {
        if let Some(handler) = parameter.as_str().and_then(|name| registry.get(name)) {
            return Ok(Callable::Bound(handler.clone()));
        }
        match self.policy {
            RulePolicy::Lenient => Ok(Callable::Unbound(parameter.clone())),
            RulePolicy::Strict => Err(ConfigError::UnregisteredHandler {
                name: handler_name(parameter),
            }),
        }
    }

    /// Binds a model-level handler by name. Unresolved names are dropped
    /// unless the policy is strict.
    fn lookup<F: Clone>(
        &self,
        name: &str,
        registry: &HashMap<String, F>,
    ) -> Result<Option<F>, ConfigError> {
        if let Some(handler) = registry.get(name) {
            return Ok(Some(handler.clone()));
        }
        match self.policy {
            RulePolicy::Lenient => {
                tracing::warn!(handler = name, "form handler not registered, ignored");
                Ok(None)
            }
            RulePolicy::Strict => Err(ConfigError::UnregisteredHandler {
                name: name.to_owned(),
            }),
        }
    }
}

fn handler_name(parameter: &Value) -> String {
    match parameter {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}

fn count(value: &Value) -> Option<usize> {
    as_number(value)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as usize)
}

fn pair<T>(value: &Value, parse: impl Fn(&Value) -> Option<T>) -> Option<(T, T)> {
    match value.as_array()?.as_slice() {
        [lo, hi] => Some((parse(lo)?, parse(hi)?)),
        _ => None,
    }
}
