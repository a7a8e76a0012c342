//! Engine and per-component validators.
//!
//! An [`Engine`] owns the shared, read-only pieces (rule catalog, message
//! resolver, configuration). Binding a model to a component identity and
//! an event sink yields a [`FormValidator`], the handle callers use to
//! validate fields and forms.

use std::sync::Arc;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::{Announcer, EventSink};
use crate::field::{FieldExecutor, FieldOutcome};
use crate::form::{FormOrchestrator, FormOutcome};
use crate::messages::{DefaultMessages, MessageCatalog, MessageResolver};
use crate::model::{Handlers, ModelLoader, ValidationModel};
use crate::rules::{PatternSet, RuleCatalog};
use crate::source::ValueSource;

/// Shared validation services.
///
/// Cheap to clone.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use formguard_validator::prelude::*;
/// use serde_json::json;
///
/// let engine = Engine::new();
/// let model = ValidationModel::builder("signup")
///     .field("age", FieldModel::new().rule(Rule::Required).rule(Rule::Min(18.0)))
///     .build();
/// let validator = engine.bind("signup-form", Arc::new(model), Arc::new(NoopSink));
///
/// let outcome = validator.validate_field("age", &json!("15"), None);
/// assert_eq!(outcome.current().message, "Must be greater than or equal to 18");
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Arc<RuleCatalog>,
    messages: Arc<MessageResolver>,
    config: EngineConfig,
}

impl Engine {
    /// Engine with built-in patterns, default messages and default config.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The rule catalog.
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// A model loader that shares this engine's patterns and rule policy.
    pub fn loader(&self, handlers: Handlers) -> ModelLoader {
        ModelLoader::new(handlers)
            .with_patterns(self.catalog.patterns().clone())
            .with_policy(self.config.rule_policy)
    }

    /// Binds `model` to a component and announces its default state.
    pub fn bind(
        &self,
        component: impl Into<String>,
        model: Arc<ValidationModel>,
        sink: Arc<dyn EventSink>,
    ) -> FormValidator {
        let component = component.into();
        if component.is_empty() {
            tracing::warn!(model = model.name(), "validator bound without a component identity");
        }
        if model.name().is_empty() {
            tracing::warn!(component = %component, "validation model has no name");
        }
        if model.is_empty() {
            tracing::warn!(
                component = %component,
                model = model.name(),
                "validation model has no field rules"
            );
        }

        let announcer = Announcer::new(sink, &component, model.name());
        announcer.default_state();

        let executor = FieldExecutor::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.messages),
            announcer,
        );
        FormValidator {
            model,
            orchestrator: FormOrchestrator::new(executor, self.config.clone()),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    patterns: Option<PatternSet>,
    messages: Option<Arc<dyn MessageCatalog>>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Replaces the named pattern set.
    pub fn patterns(mut self, patterns: PatternSet) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Replaces the message catalog.
    pub fn messages(mut self, catalog: impl MessageCatalog + 'static) -> Self {
        self.messages = Some(Arc::new(catalog));
        self
    }

    /// Sets the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the engine.
    pub fn build(self) -> Engine {
        let catalog = match self.patterns {
            Some(patterns) => RuleCatalog::with_patterns(patterns),
            None => RuleCatalog::new(),
        };
        let messages = match self.messages {
            Some(catalog) => MessageResolver::shared(catalog),
            None => MessageResolver::new(DefaultMessages),
        };
        Engine {
            catalog: Arc::new(catalog),
            messages: Arc::new(messages),
            config: self.config,
        }
    }
}

/// A validation request, as a UI layer would dispatch it.
///
/// Naming a field validates that field; otherwise carrying a form
/// validates the whole form.
#[derive(Clone, Copy, Default)]
pub struct ValidationRequest<'a> {
    /// Field to validate.
    pub input_name: Option<&'a str>,
    /// Value to validate the field with; defaults to the form's value.
    pub input_value: Option<&'a Value>,
    /// The form.
    pub form: Option<&'a dyn ValueSource>,
}

impl<'a> ValidationRequest<'a> {
    /// A request for one field.
    pub fn field(name: &'a str, value: &'a Value) -> Self {
        Self {
            input_name: Some(name),
            input_value: Some(value),
            form: None,
        }
    }

    /// A request for a whole form.
    pub fn form(form: &'a dyn ValueSource) -> Self {
        Self {
            input_name: None,
            input_value: None,
            form: Some(form),
        }
    }

    /// Attaches the form to a field request.
    pub fn in_form(mut self, form: &'a dyn ValueSource) -> Self {
        self.form = Some(form);
        self
    }
}

/// What a [`ValidationRequest`] produced.
#[derive(Debug)]
pub enum Outcome {
    /// A field was validated.
    Field(FieldOutcome),
    /// A form was validated.
    Form(FormOutcome),
}

/// A model bound to a component identity and an event sink.
#[derive(Clone)]
pub struct FormValidator {
    model: Arc<ValidationModel>,
    orchestrator: FormOrchestrator,
}

impl FormValidator {
    /// The bound model.
    pub fn model(&self) -> &ValidationModel {
        &self.model
    }

    /// Validates `value` as field `name`.
    ///
    /// With a form, group rules see the field's members and `equalTo`
    /// can look up other fields.
    pub fn validate_field(
        &self,
        name: &str,
        value: &Value,
        form: Option<&dyn ValueSource>,
    ) -> FieldOutcome {
        let field = form.and_then(|f| f.field(name));
        self.orchestrator
            .executor()
            .validate(&self.model, name, value, field, form)
    }

    /// Validates field `name` with its current value in `form`.
    pub fn validate_input(
        &self,
        form: &dyn ValueSource,
        name: &str,
    ) -> Result<FieldOutcome, EngineError> {
        let field = form
            .field(name)
            .ok_or_else(|| EngineError::FieldNotFound(name.to_owned()))?;
        Ok(self
            .orchestrator
            .executor()
            .validate(&self.model, name, field.value, Some(field), Some(form)))
    }

    /// Validates the whole form.
    pub fn validate_form(&self, form: &dyn ValueSource) -> FormOutcome {
        self.orchestrator.validate(&self.model, form)
    }

    /// Dispatches a request.
    pub fn handle(&self, request: ValidationRequest<'_>) -> Result<Outcome, EngineError> {
        match (request.input_name, request.input_value, request.form) {
            (Some(name), Some(value), form) => {
                Ok(Outcome::Field(self.validate_field(name, value, form)))
            }
            (Some(name), None, Some(form)) => self.validate_input(form, name).map(Outcome::Field),
            (Some(name), None, None) => Err(EngineError::FieldNotFound(name.to_owned())),
            (None, _, Some(form)) => Ok(Outcome::Form(self.validate_form(form))),
            (None, _, None) => Err(EngineError::EmptyRequest),
        }
    }
}
