//! Pattern rule parameters.
//!
//! A `pattern` parameter is either the name of a pattern known to the
//! [`PatternSet`] (`"email"`, `"digits"`, ...) or a literal regular
//! expression. Both are compiled once, when the rule is built.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

static DIGITS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("digits pattern is valid"));

static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+|\d{1,3}(?:,\d{3})+)(?:\.\d+)?$").expect("number pattern is valid")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?|ftp)://[^\s/$.?#].[^\s]*$").expect("url pattern is valid")
});

/// A compiled pattern, remembering whether it came from a name.
#[derive(Clone)]
pub struct Pattern {
    name: Option<String>,
    regex: Regex,
}

impl Pattern {
    /// Compiles a literal pattern.
    pub fn literal(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: None,
            regex: Regex::new(source)?,
        })
    }

    /// The shorthand name, for named patterns.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The parameter as configured: the name, or the literal source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.regex.as_str())
    }

    /// Unanchored match, as a literal pattern is written.
    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.debug_tuple("Named").field(name).finish(),
            None => f.debug_tuple("Literal").field(&self.regex.as_str()).finish(),
        }
    }
}

/// Named patterns available to `pattern` rules.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: IndexMap<String, Regex>,
}

impl PatternSet {
    /// The built-in set: `digits`, `number`, `email`, `url`.
    #[must_use]
    pub fn builtin() -> Self {
        let patterns = [
            ("digits", &DIGITS_REGEX),
            ("number", &NUMBER_REGEX),
            ("email", &EMAIL_REGEX),
            ("url", &URL_REGEX),
        ]
        .into_iter()
        .map(|(name, regex)| (name.to_owned(), Regex::clone(regex)))
        .collect();
        Self { patterns }
    }

    /// A set with no named patterns.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: IndexMap::new(),
        }
    }

    /// Adds or replaces a named pattern.
    pub fn insert(&mut self, name: impl Into<String>, source: &str) -> Result<(), regex::Error> {
        self.patterns.insert(name.into(), Regex::new(source)?);
        Ok(())
    }

    /// Returns true if `name` is a known pattern.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// Names of all known patterns.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    /// Resolves a `pattern` parameter: a known name wins over a literal.
    pub fn resolve(&self, parameter: &str) -> Result<Pattern, regex::Error> {
        match self.patterns.get(parameter) {
            Some(regex) => Ok(Pattern {
                name: Some(parameter.to_owned()),
                regex: regex.clone(),
            }),
            None => Pattern::literal(parameter),
        }
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::builtin()
    }
}
