//! Field executor: runs one field's rules against one value.
//!
//! Every configured rule runs, in declaration order, even after an `async`
//! rule has started, so the synchronous verdict is known before the async
//! check settles. The last failing rule names the message unless the
//! field has a custom one.
//!
//! A synchronous field is announced once. An async field is announced
//! twice: an interim `isValidating` state right away and a terminal state
//! once its check settles. If a synchronous rule already failed, the
//! async check is rejected on the spot instead of being waited for.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;

use crate::deferred::Deferred;
use crate::event::Announcer;
use crate::messages::MessageResolver;
use crate::model::ValidationModel;
use crate::result::{FieldResult, Rejection, ValidationPhase};
use crate::rules::{Rule, RuleCatalog, RuleInput, RuleKind, Verdict};
use crate::source::{FieldRef, ValueSource};

/// Outcome of validating one field.
#[derive(Debug)]
pub enum FieldOutcome {
    /// All rules were synchronous; the result is final.
    Settled(FieldResult),
    /// An async rule is outstanding.
    Pending(PendingField),
}

impl FieldOutcome {
    /// Returns true while an async rule is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The settled result, or the interim one for a pending field.
    #[must_use]
    pub fn current(&self) -> &FieldResult {
        match self {
            Self::Settled(result) => result,
            Self::Pending(pending) => pending.interim(),
        }
    }

    /// Waits for the terminal result.
    pub async fn finish(self) -> FieldResult {
        match self {
            Self::Settled(result) => result,
            Self::Pending(pending) => pending.await,
        }
    }
}

/// A field whose async rule has not settled yet.
///
/// Awaiting it yields the terminal [`FieldResult`]. The terminal state is
/// announced when the check settles whether or not anybody awaits.
#[derive(Debug)]
pub struct PendingField {
    interim: FieldResult,
    rule: Deferred<(), Rejection>,
    terminal: Deferred<FieldResult, FieldResult>,
}

impl PendingField {
    /// The `isValidating` state announced when validation started.
    #[must_use]
    pub fn interim(&self) -> &FieldResult {
        &self.interim
    }

    /// The async rule's own deferred.
    #[must_use]
    pub fn rule_handle(&self) -> &Deferred<(), Rejection> {
        &self.rule
    }

    /// The terminal result, if the check has settled.
    #[must_use]
    pub fn peek(&self) -> Option<FieldResult> {
        self.terminal.peek().map(|outcome| outcome.unwrap_or_else(|state| state))
    }
}

impl Future for PendingField {
    type Output = FieldResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().terminal)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or_else(|state| state))
    }
}

/// Runs a field's rules and announces the result.
#[derive(Clone)]
pub struct FieldExecutor {
    catalog: Arc<RuleCatalog>,
    messages: Arc<MessageResolver>,
    announcer: Announcer,
}

impl FieldExecutor {
    pub(crate) fn new(
        catalog: Arc<RuleCatalog>,
        messages: Arc<MessageResolver>,
        announcer: Announcer,
    ) -> Self {
        Self {
            catalog,
            messages,
            announcer,
        }
    }

    pub(crate) fn announcer(&self) -> &Announcer {
        &self.announcer
    }

    /// Validates `value` as field `name` of `model`.
    ///
    /// `field` gives the field's shape (for group rules) and `form` the
    /// surrounding form (for `equalTo`). A field without rules is
    /// vacuously valid and is not announced.
    pub fn validate(
        &self,
        model: &ValidationModel,
        name: &str,
        value: &Value,
        field: Option<FieldRef<'_>>,
        form: Option<&dyn ValueSource>,
    ) -> FieldOutcome {
        let Some(field_model) = model.field(name) else {
            tracing::warn!(
                model = model.name(),
                field = name,
                "no validation rules for field, skipped"
            );
            return FieldOutcome::Settled(FieldResult::valid(value.clone()));
        };

        let input = RuleInput { value, field, form };
        let custom = field_model.custom_message();
        let mut result = FieldResult::valid(value.clone());
        let mut pending: Option<(Deferred<(), Rejection>, &Rule)> = None;

        for rule in field_model.rules() {
            match self.catalog.evaluate(rule, &input) {
                Verdict::Pass => {}
                Verdict::Fail => {
                    let message = self.messages.resolve(rule, custom, None);
                    result.record_failure(rule.kind(), message);
                }
                Verdict::Message(returned) => {
                    let message = self
                        .messages
                        .resolve(rule, custom, Some(returned.as_str()));
                    result.record_failure(rule.kind(), message);
                }
                Verdict::Deferred(deferred) => {
                    result.is_async = true;
                    pending = Some((deferred, rule));
                }
            }
        }

        tracing::debug!(
            field = name,
            valid = result.valid,
            failed = ?result.failed_rules,
            is_async = result.is_async,
            "field rules evaluated"
        );

        let Some((rule_deferred, async_rule)) = pending else {
            self.announcer.field(name, &result);
            return FieldOutcome::Settled(result);
        };

        let mut interim = result.clone();
        interim.phase = ValidationPhase::Validating;
        self.announcer.field(name, &interim);

        if !result.valid {
            rule_deferred
                .settler()
                .reject(Rejection::with_message(result.message.clone()));
        }

        let terminal: Deferred<FieldResult, FieldResult> = Deferred::new();
        let settler = terminal.settler();
        let announcer = self.announcer.clone();
        let messages = Arc::clone(&self.messages);
        let async_rule = async_rule.clone();
        let custom = custom.map(str::to_owned);
        let name = name.to_owned();

        rule_deferred.on_settle(move |outcome| {
            let mut state = result;
            state.phase = ValidationPhase::Done;
            if let Err(rejection) = outcome
                && state.valid
            {
                let message =
                    messages.resolve(&async_rule, custom.as_deref(), rejection.message());
                state.record_failure(RuleKind::Async, message);
            }
            announcer.field(&name, &state);
            if state.valid {
                settler.resolve(state);
            } else {
                settler.reject(state);
            }
        });

        FieldOutcome::Pending(PendingField {
            interim,
            rule: rule_deferred,
            terminal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventSink, ValidationEvent};
    use crate::model::FieldModel;
    use formguard_eventbus::{EventBus, EventSubscriber};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn executor() -> (FieldExecutor, EventSubscriber<ValidationEvent>) {
        let bus: Arc<EventBus<ValidationEvent>> = Arc::new(EventBus::new(16));
        let rx = bus.subscribe();
        let sink: Arc<dyn EventSink> = bus;
        let executor = FieldExecutor::new(
            Arc::new(RuleCatalog::new()),
            Arc::new(MessageResolver::default()),
            Announcer::new(sink, "c", "m"),
        );
        (executor, rx)
    }

    fn model(field: FieldModel) -> ValidationModel {
        ValidationModel::builder("m").field("f", field).build()
    }

    #[test]
    fn last_failing_rule_names_the_message() {
        let (executor, mut rx) = executor();
        let model = model(FieldModel::new().rule(Rule::MinLength(5)).rule(Rule::Min(10.0)));

        let outcome = executor.validate(&model, "f", &json!("abc"), None, None);
        let result = outcome.current();

        assert!(!result.valid);
        assert_eq!(result.failed_rules.as_slice(), [RuleKind::MinLength, RuleKind::Min]);
        assert_eq!(result.message, "Must be greater than or equal to 10");
        assert_eq!(rx.drain().len(), 1);
    }

    #[test]
    fn unconfigured_field_is_valid_and_silent() {
        let (executor, mut rx) = executor();
        let model = model(FieldModel::new().rule(Rule::Required));

        let outcome = executor.validate(&model, "other", &json!(""), None, None);

        assert_eq!(outcome.current(), &FieldResult::valid(json!("")));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn returned_message_is_used_for_func_rules() {
        let (executor, _rx) = executor();
        let model = model(FieldModel::new().rule(Rule::func(|_| Err::<(), _>("Taken"))));

        let outcome = executor.validate(&model, "f", &json!("bob"), None, None);
        assert_eq!(outcome.current().message, "Taken");
    }

    #[test]
    fn async_field_announces_interim_then_terminal() {
        let (executor, mut rx) = executor();
        let slot = Arc::new(parking_lot::Mutex::new(None));
        let keep = Arc::clone(&slot);
        let model = model(FieldModel::new().rule(Rule::async_check(move |_, settler| {
            *keep.lock() = Some(settler);
        })));

        let outcome = executor.validate(&model, "f", &json!("x"), None, None);
        let FieldOutcome::Pending(pending) = outcome else {
            panic!("expected a pending field");
        };
        assert_eq!(pending.interim().phase, ValidationPhase::Validating);
        assert!(pending.peek().is_none());
        assert_eq!(rx.drain().len(), 1);

        let settler = slot.lock().take().unwrap();
        settler.reject(Rejection::with_message("server error"));

        let terminal = pending.peek().unwrap();
        assert!(!terminal.valid);
        assert_eq!(terminal.failed_rules.as_slice(), [RuleKind::Async]);
        assert_eq!(terminal.message, "server error");
        assert_eq!(terminal.phase, ValidationPhase::Done);
        assert_eq!(rx.drain().len(), 1);
    }

    #[test]
    fn sync_failure_rejects_async_rule_immediately() {
        let (executor, mut rx) = executor();
        let model = model(
            FieldModel::new()
                .rule(Rule::async_check(|_, _settler| {}))
                .rule(Rule::Required),
        );

        let outcome = executor.validate(&model, "f", &json!(""), None, None);
        let FieldOutcome::Pending(pending) = outcome else {
            panic!("expected a pending field");
        };

        assert!(!pending.rule_handle().is_pending());
        let terminal = pending.peek().unwrap();
        assert_eq!(terminal.failed_rules.as_slice(), [RuleKind::Required]);
        assert_eq!(terminal.message, "This field is required");
        assert_eq!(rx.drain().len(), 2);
    }
}
