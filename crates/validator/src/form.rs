//! Form orchestrator: validates every field of a form and combines the
//! outcomes into one verdict.
//!
//! Steps, in order:
//!
//! 1. run the field executor for every named field of the form;
//! 2. split the outcomes into settled and pending;
//! 3. with nothing pending and no model-level async check, AND the field
//!    verdicts with the model-level sync check and report synchronously;
//! 4. otherwise, if anything already failed, reject the form at once
//!    without waiting for outstanding checks;
//! 5. otherwise join every pending field and the model-level async check.
//!    The form resolves once all of them resolve and rejects with the
//!    message of whichever rejects first.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use crate::config::EngineConfig;
use crate::deferred::{Deferred, Settler};
use crate::field::{FieldExecutor, FieldOutcome, PendingField};
use crate::model::{FormCheck, ValidationModel};
use crate::result::{FormReport, FormResult, Rejection};
use crate::source::ValueSource;

/// Outcome of validating a form.
#[derive(Debug)]
pub enum FormOutcome {
    /// No async work took part; the report is final.
    Settled(FormReport),
    /// Async work took part.
    Pending(PendingForm),
}

impl FormOutcome {
    /// Returns true when async work took part.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Waits for the terminal form result.
    pub async fn finish(self) -> FormResult {
        match self {
            Self::Settled(report) => report.result,
            Self::Pending(pending) => pending.await,
        }
    }
}

/// A form whose async checks have not all settled.
///
/// Awaiting it yields the terminal [`FormResult`].
#[derive(Debug)]
pub struct PendingForm {
    interim: FormResult,
    terminal: Deferred<FormResult, FormResult>,
}

impl PendingForm {
    /// The state announced when validation started.
    #[must_use]
    pub fn interim(&self) -> &FormResult {
        &self.interim
    }

    /// The terminal result, if settled.
    #[must_use]
    pub fn peek(&self) -> Option<FormResult> {
        self.terminal.peek().map(|outcome| outcome.unwrap_or_else(|state| state))
    }
}

impl Future for PendingForm {
    type Output = FormResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().terminal)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or_else(|state| state))
    }
}

/// Validates whole forms.
#[derive(Clone)]
pub struct FormOrchestrator {
    executor: FieldExecutor,
    config: EngineConfig,
}

impl FormOrchestrator {
    pub(crate) fn new(executor: FieldExecutor, config: EngineConfig) -> Self {
        Self { executor, config }
    }

    /// The executor used for each field.
    pub fn executor(&self) -> &FieldExecutor {
        &self.executor
    }

    /// Validates every named field of `form` against `model`.
    pub fn validate(&self, model: &ValidationModel, form: &dyn ValueSource) -> FormOutcome {
        let mut fields_valid = true;
        let mut pending: Vec<(String, PendingField)> = Vec::new();

        for field in form.fields() {
            if field.name.is_empty() {
                continue;
            }
            match self
                .executor
                .validate(model, field.name, field.value, Some(field), Some(form))
            {
                FieldOutcome::Settled(result) => fields_valid &= result.valid,
                FieldOutcome::Pending(field_pending) => {
                    fields_valid &= field_pending.interim().valid;
                    pending.push((field.name.to_owned(), field_pending));
                }
            }
        }

        let check = model.form_check().map(|check| check(form));
        let valid = fields_valid && check.as_ref().is_none_or(|c| c.valid);
        let message = if valid {
            String::new()
        } else {
            failure_message(check, model)
        };
        let announcer = self.executor.announcer();

        let form_async = model.form_async_check();
        if pending.is_empty() && form_async.is_none() {
            let result = FormResult::immediate(valid, message);
            tracing::debug!(model = model.name(), valid, "form validated");
            announcer.form(&result);
            return FormOutcome::Settled(FormReport {
                result,
                values: form.values(),
            });
        }

        if !valid {
            tracing::debug!(
                model = model.name(),
                outstanding = pending.len(),
                "form rejected before async checks settled"
            );
            // A model-level async check on its own still reports that it started.
            if pending.is_empty() {
                announcer.form(&FormResult::validating());
            }
            let result = FormResult::done(false, message);
            announcer.form(&result);
            if self.config.log_late_results {
                log_late_results(&pending);
            }
            return FormOutcome::Pending(PendingForm {
                interim: result.clone(),
                terminal: Deferred::rejected(result),
            });
        }

        let interim = FormResult::validating();
        announcer.form(&interim);

        let terminal: Deferred<FormResult, FormResult> = Deferred::new();
        {
            let announcer = announcer.clone();
            terminal.on_settle(move |outcome| {
                let state = match outcome {
                    Ok(state) | Err(state) => state,
                };
                announcer.form(state);
            });
        }

        let members = pending.len() + usize::from(form_async.is_some());
        let join = Join {
            remaining: Arc::new(AtomicUsize::new(members)),
            settler: terminal.settler(),
            fallback: model.error_message().unwrap_or_default().to_owned(),
            log_late: self.config.log_late_results,
        };

        for (name, field_pending) in &pending {
            join.add(field_pending.rule_handle(), name.clone());
        }
        if let Some(check) = form_async {
            let deferred = Deferred::new();
            check(form, deferred.settler());
            join.add(&deferred, model.name().to_owned());
        }

        FormOutcome::Pending(PendingForm { interim, terminal })
    }
}

/// Combines member deferreds into the form's terminal deferred.
struct Join {
    remaining: Arc<AtomicUsize>,
    settler: Settler<FormResult, FormResult>,
    fallback: String,
    log_late: bool,
}

impl Join {
    fn add(&self, member: &Deferred<(), Rejection>, label: String) {
        let remaining = Arc::clone(&self.remaining);
        let settler = self.settler.clone();
        let fallback = self.fallback.clone();
        let log_late = self.log_late;

        member.on_settle(move |outcome| match outcome {
            Ok(()) => {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    settler.resolve(FormResult::done(true, String::new()));
                }
            }
            Err(rejection) => {
                let message = rejection.message().map_or(fallback, str::to_owned);
                if !settler.reject(FormResult::done(false, message)) && log_late {
                    tracing::debug!(member = %label, %rejection, "late rejection ignored");
                }
            }
        });
    }
}

fn failure_message(check: Option<FormCheck>, model: &ValidationModel) -> String {
    check
        .and_then(|c| c.error_message)
        .or_else(|| model.error_message().map(str::to_owned))
        .unwrap_or_default()
}

fn log_late_results(pending: &[(String, PendingField)]) {
    for (name, field_pending) in pending {
        let handle = field_pending.rule_handle();
        if !handle.is_pending() {
            continue;
        }
        let name = name.clone();
        handle.on_settle(move |outcome| {
            tracing::debug!(
                field = %name,
                resolved = outcome.is_ok(),
                "async result arrived after the form was rejected"
            );
        });
    }
}
