//! Failure messages.
//!
//! A message is resolved for the last failing rule of a field, in this
//! order:
//!
//! 1. the field's custom message, if configured;
//! 2. the catalog template keyed by the rule name, with the rule parameter
//!    substituted;
//! 3. for `pattern` rules, the template keyed by the pattern's shorthand
//!    name, or `inlinePattern` for literal patterns;
//! 4. the message the rule returned itself;
//! 5. an empty string.
//!
//! Templates substitute `{rule}` with the whole parameter (list elements
//! joined by `,`) and `{rule[0]}`, `{rule[1]}` with single elements.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::rules::Rule;

/// Template key used for literal (unnamed) patterns.
pub const INLINE_PATTERN: &str = "inlinePattern";

/// Lookup contract for human-facing message templates.
pub trait MessageCatalog: Send + Sync {
    /// Returns the template for `key`, if the catalog has one.
    fn template(&self, key: &str) -> Option<Cow<'_, str>>;
}

/// The built-in English templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl MessageCatalog for DefaultMessages {
    fn template(&self, key: &str) -> Option<Cow<'_, str>> {
        let template = match key {
            "required" => "This field is required",
            "acceptance" => "You must be accept the terms",
            "min" => "Must be greater than or equal to {rule}",
            "max" => "Must be less than or equal to {rule}",
            "range" => "Must be between {rule[0]} and {rule[1]}",
            "length" => "Must be {rule} characters",
            "minLength" => "Must be at least {rule} characters",
            "maxLength" => "Must be at most {rule} characters",
            "minChecked" => "Choose at least {rule} options",
            "maxChecked" => "Choose a maximum of {rule} options",
            "rangeLength" => "Must be between {rule[0]} and {rule[1]} characters",
            "oneOf" => "Must be one of: {rule}",
            "equalTo" => "Must be the same as {rule}",
            "digits" => "Must only contain digits",
            "number" => "Must be a number",
            "email" => "Must be a valid email",
            "url" => "Must be a valid url",
            INLINE_PATTERN => "Is invalid",
            _ => return None,
        };
        Some(Cow::Borrowed(template))
    }
}

/// A replaceable template table, falling back to [`DefaultMessages`].
///
/// Deserializes from a flat JSON object of `key -> template`.
///
/// ```
/// use formguard_validator::messages::{MessageCatalog, MessageTable};
///
/// let table: MessageTable = serde_json::from_str(r#"{"required": "Obligatoire"}"#).unwrap();
/// assert_eq!(table.template("required").as_deref(), Some("Obligatoire"));
/// assert_eq!(table.template("email").as_deref(), Some("Must be a valid email"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTable {
    templates: HashMap<String, String>,
}

impl MessageTable {
    /// Creates an empty table (all lookups fall back to the defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a template.
    #[must_use = "builder methods must be chained or built"]
    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }
}

impl MessageCatalog for MessageTable {
    fn template(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.templates.get(key) {
            Some(template) => Some(Cow::Borrowed(template.as_str())),
            None => DefaultMessages.template(key),
        }
    }
}

/// Resolves failure messages against a [`MessageCatalog`].
#[derive(Clone)]
pub struct MessageResolver {
    catalog: Arc<dyn MessageCatalog>,
}

impl MessageResolver {
    /// Resolver over `catalog`.
    pub fn new(catalog: impl MessageCatalog + 'static) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// Resolver over a shared catalog.
    pub fn shared(catalog: Arc<dyn MessageCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolves the message for a failed `rule`.
    ///
    /// `custom` is the field-level override; `returned` is the message the
    /// rule produced itself, if any.
    #[must_use]
    pub fn resolve(&self, rule: &Rule, custom: Option<&str>, returned: Option<&str>) -> String {
        if let Some(custom) = custom.filter(|c| !c.is_empty()) {
            return custom.to_owned();
        }
        let args = rule.message_args();
        if let Some(template) = self.catalog.template(rule.kind().as_str()) {
            return render(&template, &args);
        }
        if let Rule::Pattern(pattern) = rule {
            let shorthand = pattern
                .name()
                .and_then(|name| self.catalog.template(name))
                .or_else(|| self.catalog.template(INLINE_PATTERN));
            if let Some(template) = shorthand {
                return render(&template, &args);
            }
        }
        returned.map(str::to_owned).unwrap_or_default()
    }
}

impl Default for MessageResolver {
    fn default() -> Self {
        Self::new(DefaultMessages)
    }
}

impl fmt::Debug for MessageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageResolver").finish_non_exhaustive()
    }
}

/// Substitutes `{rule}` and `{rule[i]}` in `template`.
#[must_use]
pub fn render(template: &str, args: &[String]) -> String {
    let mut rendered = template.replace("{rule}", &args.join(","));
    for (i, arg) in args.iter().enumerate() {
        rendered = rendered.replace(&format!("{{rule[{i}]}}"), arg);
    }
    rendered
}
