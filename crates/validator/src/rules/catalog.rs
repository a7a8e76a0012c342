//! Rule catalog: evaluates one rule against one value.
//!
//! The catalog is an explicit value handed to the engine rather than a
//! global table, so tests can run with their own named patterns.

use serde_json::Value;

use super::{Callable, PatternSet, Rule, RuleOutcome};
use crate::deferred::Deferred;
use crate::result::Rejection;
use crate::source::{FieldKind, FieldRef, ValueSource};
use crate::value::{as_number, is_truthy, loose_eq, strict_eq, to_display};

/// Everything a rule may look at.
#[derive(Clone, Copy)]
pub struct RuleInput<'a> {
    /// Value under validation.
    pub value: &'a Value,
    /// The field as the value source exposes it, when known.
    pub field: Option<FieldRef<'a>>,
    /// The surrounding form, for cross-field rules.
    pub form: Option<&'a dyn ValueSource>,
}

impl<'a> RuleInput<'a> {
    /// Input with only a value; no field shape or form context.
    #[must_use]
    pub fn value(value: &'a Value) -> Self {
        Self {
            value,
            field: None,
            form: None,
        }
    }

    fn checked_count(&self) -> usize {
        match self.field {
            Some(field) => field.checked_count(),
            None => usize::from(is_truthy(self.value)),
        }
    }

    fn is_group(&self) -> bool {
        self.field.is_some_and(|f| f.kind() == FieldKind::Group)
    }
}

/// Result of evaluating a single rule.
#[derive(Debug)]
pub enum Verdict {
    /// The rule passed.
    Pass,
    /// The rule failed.
    Fail,
    /// The rule failed and supplied its own message.
    Message(String),
    /// The rule is asynchronous; the deferred settles later.
    Deferred(Deferred<(), Rejection>),
}

impl Verdict {
    /// Returns true for [`Verdict::Pass`].
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    fn check(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }
}

impl From<RuleOutcome> for Verdict {
    fn from(outcome: RuleOutcome) -> Self {
        match outcome {
            RuleOutcome::Pass => Self::Pass,
            RuleOutcome::Fail => Self::Fail,
            RuleOutcome::Message(message) => Self::Message(message),
        }
    }
}

/// The rule catalog.
///
/// # Examples
///
/// ```
/// use formguard_validator::rules::{Rule, RuleCatalog, RuleInput};
/// use serde_json::json;
///
/// let catalog = RuleCatalog::new();
/// let value = json!("15");
/// assert!(!catalog.evaluate(&Rule::Min(18.0), &RuleInput::value(&value)).is_pass());
/// assert!(catalog.evaluate(&Rule::Max(18.0), &RuleInput::value(&value)).is_pass());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    patterns: PatternSet,
}

impl RuleCatalog {
    /// Catalog with the built-in named patterns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with a custom named pattern set.
    #[must_use]
    pub fn with_patterns(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// Named patterns used when resolving `pattern` parameters.
    #[must_use]
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Evaluates `rule` against `input`.
    ///
    /// Never panics and never returns an error: misconfigured rules fail
    /// and log a diagnostic.
    pub fn evaluate(&self, rule: &Rule, input: &RuleInput<'_>) -> Verdict {
        let value = input.value;
        match rule {
            Rule::Required => {
                if input.is_group() {
                    Verdict::check(input.checked_count() > 0)
                } else {
                    Verdict::check(is_truthy(value))
                }
            }
            Rule::Func(Callable::Bound(predicate)) => predicate(value).into(),
            Rule::Func(Callable::Unbound(parameter)) => {
                tracing::warn!(%parameter, "func validation rule is not a function");
                Verdict::Fail
            }
            Rule::Async(callable) => {
                let deferred = Deferred::new();
                match callable {
                    Callable::Bound(check) => check(value, deferred.settler()),
                    Callable::Unbound(parameter) => {
                        tracing::warn!(%parameter, "async validation rule is not an async handler");
                        deferred.settler().reject(Rejection::silent());
                    }
                }
                Verdict::Deferred(deferred)
            }
            Rule::Acceptance => Verdict::check(
                loose_eq(value, &Value::Bool(true)) || value.as_str() == Some("true"),
            ),
            Rule::MinChecked(min) => Verdict::check(input.checked_count() >= *min),
            Rule::MaxChecked(max) => Verdict::check(input.checked_count() <= *max),
            Rule::Max(max) => Verdict::check(as_number(value).is_some_and(|n| n <= *max)),
            Rule::Min(min) => Verdict::check(as_number(value).is_some_and(|n| n >= *min)),
            Rule::Range(lo, hi) => {
                Verdict::check(as_number(value).is_some_and(|n| *lo <= n && n <= *hi))
            }
            Rule::Length(len) => Verdict::check(char_len(value).is_some_and(|n| n == *len)),
            Rule::MinLength(min) => Verdict::check(char_len(value).is_some_and(|n| n >= *min)),
            Rule::MaxLength(max) => Verdict::check(char_len(value).is_some_and(|n| n <= *max)),
            Rule::RangeLength(lo, hi) => {
                Verdict::check(char_len(value).is_some_and(|n| *lo <= n && n <= *hi))
            }
            Rule::OneOf(options) => {
                Verdict::check(options.iter().any(|option| loose_eq(option, value)))
            }
            Rule::EqualTo(other) => Verdict::check(self.equals_field(other, input)),
            Rule::Pattern(pattern) => {
                Verdict::check(is_truthy(value) && pattern.is_match(&to_display(value)))
            }
        }
    }

    fn equals_field(&self, other: &str, input: &RuleInput<'_>) -> bool {
        let Some(form) = input.form else {
            tracing::warn!(other, "equalTo rule evaluated without a form");
            return false;
        };
        match form.field(other) {
            Some(field) => strict_eq(field.value, input.value),
            None => {
                tracing::warn!(other, "equalTo rule names a field missing from the form");
                false
            }
        }
    }
}

fn char_len(value: &Value) -> Option<usize> {
    value.as_str().map(|s| s.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::DeferredState;
    use crate::source::{FormData, GroupMember};
    use rstest::rstest;
    use serde_json::json;

    fn eval(rule: &Rule, value: Value) -> bool {
        RuleCatalog::new()
            .evaluate(rule, &RuleInput::value(&value))
            .is_pass()
    }

    #[rstest]
    #[case(Rule::Required, json!("x"), true)]
    #[case(Rule::Required, json!(""), false)]
    #[case(Rule::Required, json!(0), false)]
    #[case(Rule::Required, json!(null), false)]
    #[case(Rule::Acceptance, json!(true), true)]
    #[case(Rule::Acceptance, json!("true"), true)]
    #[case(Rule::Acceptance, json!(1), true)]
    #[case(Rule::Acceptance, json!(false), false)]
    #[case(Rule::Acceptance, json!("yes"), false)]
    #[case(Rule::Min(18.0), json!("15"), false)]
    #[case(Rule::Min(18.0), json!(18), true)]
    #[case(Rule::Min(18.0), json!("abc"), false)]
    #[case(Rule::Max(10.0), json!("9.5"), true)]
    #[case(Rule::Max(10.0), json!(11), false)]
    #[case(Rule::Max(10.0), json!(null), false)]
    #[case(Rule::Range(1.0, 5.0), json!(5), true)]
    #[case(Rule::Range(1.0, 5.0), json!(0), false)]
    #[case(Rule::Length(3), json!("abc"), true)]
    #[case(Rule::Length(3), json!(123), false)]
    #[case(Rule::MinLength(2), json!("é"), false)]
    #[case(Rule::MaxLength(2), json!("éé"), true)]
    #[case(Rule::RangeLength(2, 4), json!("abcde"), false)]
    #[case(Rule::OneOf(vec![json!(1), json!("two")]), json!("1"), true)]
    #[case(Rule::OneOf(vec![json!(0)]), json!(0), true)]
    #[case(Rule::OneOf(vec![json!("a")]), json!("b"), false)]
    fn builtin_rules(#[case] rule: Rule, #[case] value: Value, #[case] expected: bool) {
        assert_eq!(eval(&rule, value), expected, "rule {rule:?}");
    }

    #[test]
    fn pattern_fails_on_empty_and_matches_display_string() {
        let digits = Rule::Pattern(PatternSet::builtin().resolve("digits").unwrap());
        assert!(eval(&digits, json!(123)));
        assert!(eval(&digits, json!("123")));
        assert!(!eval(&digits, json!("")));
        assert!(!eval(&digits, json!("12a")));
        assert!(eval(&digits, json!(1.0)));
    }

    #[test]
    fn required_on_group_needs_a_checked_member() {
        let form = FormData::new()
            .with_group("none", vec![GroupMember::new("a", false)])
            .with_group("some", vec![GroupMember::new("a", false), GroupMember::new("b", true)]);
        let catalog = RuleCatalog::new();

        for (name, expected) in [("none", false), ("some", true)] {
            let field = form.field(name).unwrap();
            let input = RuleInput {
                value: field.value,
                field: Some(field),
                form: Some(&form),
            };
            assert_eq!(catalog.evaluate(&Rule::Required, &input).is_pass(), expected);
        }
    }

    #[test]
    fn checked_bounds_count_group_members() {
        let form = FormData::new().with_group(
            "toppings",
            vec![
                GroupMember::new("cheese", true),
                GroupMember::new("ham", true),
                GroupMember::new("olives", false),
            ],
        );
        let field = form.field("toppings").unwrap();
        let input = RuleInput {
            value: field.value,
            field: Some(field),
            form: Some(&form),
        };
        let catalog = RuleCatalog::new();

        assert!(catalog.evaluate(&Rule::MinChecked(2), &input).is_pass());
        assert!(!catalog.evaluate(&Rule::MinChecked(3), &input).is_pass());
        assert!(catalog.evaluate(&Rule::MaxChecked(2), &input).is_pass());
        assert!(!catalog.evaluate(&Rule::MaxChecked(1), &input).is_pass());
    }

    #[test]
    fn equal_to_compares_against_other_field() {
        let form = FormData::new()
            .with("password", "abc")
            .with("confirmPassword", "abc");
        let catalog = RuleCatalog::new();
        let rule = Rule::EqualTo("password".into());

        let same = json!("abc");
        let input = RuleInput {
            value: &same,
            field: None,
            form: Some(&form),
        };
        assert!(catalog.evaluate(&rule, &input).is_pass());

        let other = json!("abd");
        let input = RuleInput {
            value: &other,
            field: None,
            form: Some(&form),
        };
        assert!(!catalog.evaluate(&rule, &input).is_pass());
    }

    #[test]
    fn equal_to_compares_numbers_by_value() {
        let form = FormData::new().with("total", json!(1));
        let rule = Rule::EqualTo("total".into());

        let float = json!(1.0);
        let text = json!("1");
        let check = |value: &Value| {
            RuleCatalog::new()
                .evaluate(
                    &rule,
                    &RuleInput {
                        value,
                        field: None,
                        form: Some(&form),
                    },
                )
                .is_pass()
        };
        assert!(check(&float));
        assert!(!check(&text));
    }

    #[test]
    fn equal_to_without_form_or_target_fails() {
        let catalog = RuleCatalog::new();
        let value = json!("abc");
        assert!(!catalog
            .evaluate(&Rule::EqualTo("password".into()), &RuleInput::value(&value))
            .is_pass());

        let form = FormData::new().with("other", "abc");
        let input = RuleInput {
            value: &value,
            field: None,
            form: Some(&form),
        };
        assert!(!catalog
            .evaluate(&Rule::EqualTo("password".into()), &input)
            .is_pass());
    }

    #[test]
    fn func_message_is_returned() {
        let rule = Rule::func(|_: &Value| "Taken");
        let value = json!("x");
        match RuleCatalog::new().evaluate(&rule, &RuleInput::value(&value)) {
            Verdict::Message(message) => assert_eq!(message, "Taken"),
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn unbound_func_fails() {
        let rule = Rule::Func(Callable::Unbound(json!(42)));
        assert!(!eval(&rule, json!("x")));
    }

    #[test]
    fn async_rule_hands_a_settler_to_the_handler() {
        let rule = Rule::async_check(|value, settler| {
            if value == "free" {
                settler.resolve(());
            }
        });
        let catalog = RuleCatalog::new();

        let free = json!("free");
        let Verdict::Deferred(resolved) = catalog.evaluate(&rule, &RuleInput::value(&free)) else {
            panic!("expected deferred");
        };
        assert_eq!(resolved.state(), DeferredState::Resolved);

        let taken = json!("taken");
        let Verdict::Deferred(pending) = catalog.evaluate(&rule, &RuleInput::value(&taken)) else {
            panic!("expected deferred");
        };
        assert!(pending.is_pending());
    }

    #[test]
    fn unbound_async_is_rejected_immediately() {
        let rule = Rule::Async(Callable::Unbound(json!("not a handler")));
        let value = json!("x");
        let Verdict::Deferred(deferred) = RuleCatalog::new().evaluate(&rule, &RuleInput::value(&value))
        else {
            panic!("expected deferred");
        };
        assert_eq!(deferred.peek(), Some(Err(Rejection::silent())));
    }
}
