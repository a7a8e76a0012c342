//! Whole-form validation: sync aggregation, async joining and fail-fast.

mod common;

use common::{Harness, Parked};
use formguard_validator::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn settled(outcome: FormOutcome) -> FormReport {
    match outcome {
        FormOutcome::Settled(report) => report,
        FormOutcome::Pending(_) => panic!("expected a settled form"),
    }
}

fn pending(outcome: FormOutcome) -> PendingForm {
    match outcome {
        FormOutcome::Pending(pending) => pending,
        FormOutcome::Settled(_) => panic!("expected a pending form"),
    }
}

#[test]
fn valid_sync_form_returns_values() {
    let model = ValidationModel::builder("signup")
        .field("age", FieldModel::new().rule(Rule::Min(18.0)))
        .field("name", FieldModel::new().rule(Rule::Required))
        .build();
    let mut h = Harness::new(model);
    let form = FormData::new()
        .with("name", json!("Trinity"))
        .with("age", json!(30))
        .with("newsletter", json!(true));

    let report = settled(h.validator.validate_form(&form));

    assert!(report.result.valid);
    assert_eq!(report.result.message, "");
    assert_eq!(
        report.values.keys().collect::<Vec<_>>(),
        ["name", "age", "newsletter"]
    );
    assert_eq!(h.form_states(), [report.result]);
}

#[test]
fn model_check_is_anded_with_fields() {
    let model = ValidationModel::builder("signup")
        .field("name", FieldModel::new().rule(Rule::Required))
        .validate(|form: &dyn ValueSource| {
            form.field("name")
                .is_some_and(|f| f.value != &json!("root"))
        })
        .error_message("The form is invalid")
        .build();
    let h = Harness::new(model);

    let ok = settled(h.validator.validate_form(&FormData::new().with("name", json!("neo"))));
    let rejected =
        settled(h.validator.validate_form(&FormData::new().with("name", json!("root"))));

    assert!(ok.result.valid);
    assert!(!rejected.result.valid);
    assert_eq!(rejected.result.message, "The form is invalid");
}

#[tokio::test]
async fn one_rejected_async_field_fails_the_form() {
    let first = Parked::new();
    let second = Parked::new();
    let model = ValidationModel::builder("signup")
        .field("username", FieldModel::new().rule(first.rule()))
        .field("email", FieldModel::new().rule(second.rule()))
        .build();
    let mut h = Harness::new(model);
    let form = FormData::new()
        .with("username", json!("neo"))
        .with("email", json!("neo@example.com"));

    let pending = pending(h.validator.validate_form(&form));
    assert_eq!(pending.interim().phase, ValidationPhase::Validating);

    first.take().resolve(());
    assert!(pending.peek().is_none());
    second.take().reject("server error".into());

    let result = pending.await;
    assert!(!result.valid);
    assert_eq!(result.message, "server error");

    let phases: Vec<_> = h.form_states().into_iter().map(|s| s.phase).collect();
    assert_eq!(phases, [ValidationPhase::Validating, ValidationPhase::Done]);
}

#[tokio::test]
async fn all_resolved_async_fields_pass_the_form() {
    let parked = Parked::new();
    let model = ValidationModel::builder("signup")
        .field("a", FieldModel::new().rule(parked.rule()))
        .field("b", FieldModel::new().rule(parked.rule()))
        .build();
    let h = Harness::new(model);
    let form = FormData::new().with("a", json!(1)).with("b", json!(2));

    let outcome = h.validator.validate_form(&form);
    assert_eq!(parked.count(), 2);

    let settlers = [parked.take(), parked.take()];
    tokio::spawn(async move {
        for settler in settlers {
            tokio::task::yield_now().await;
            settler.resolve(());
        }
    });

    let result = outcome.finish().await;
    assert!(result.valid);
    assert!(result.is_async);
}

#[test]
fn sync_failure_rejects_without_waiting() {
    let parked = Parked::new();
    let model = ValidationModel::builder("signup")
        .field("age", FieldModel::new().rule(Rule::Min(18.0)))
        .field("username", FieldModel::new().rule(parked.rule()))
        .error_message("Please fix the errors")
        .build();
    let mut h = Harness::new(model);
    let form = FormData::new()
        .with("age", json!(12))
        .with("username", json!("neo"));

    let pending = pending(h.validator.validate_form(&form));

    let result = pending.peek().expect("rejected before the async check settled");
    assert!(!result.valid);
    assert_eq!(result.message, "Please fix the errors");
    assert_eq!(parked.count(), 1);

    parked.take().resolve(());
    let states = h.form_states();
    assert_eq!(states.len(), 1);
    assert!(!states[0].valid);
}

#[test]
fn sync_failure_skips_model_async_check() {
    let server = Parked::new();
    let model = ValidationModel::builder("signup")
        .field("age", FieldModel::new().rule(Rule::Min(18.0)))
        .validate_async(server.form_check())
        .error_message("Please fix the errors")
        .build();
    let mut h = Harness::new(model);

    let pending = pending(h.validator.validate_form(&FormData::new().with("age", json!(12))));

    assert_eq!(server.count(), 0);
    assert_eq!(
        pending.peek(),
        Some(FormResult {
            valid: false,
            is_async: true,
            message: "Please fix the errors".into(),
            phase: ValidationPhase::Done,
        })
    );
    let phases: Vec<_> = h.form_states().into_iter().map(|s| s.phase).collect();
    assert_eq!(phases, [ValidationPhase::Validating, ValidationPhase::Done]);
}

fn resolved_then_min() -> FieldModel {
    FieldModel::new()
        .rule(Rule::async_check(|_, settler| {
            settler.resolve(());
        }))
        .rule(Rule::Min(18.0))
}

#[test]
fn early_resolved_async_rule_keeps_later_sync_failure() {
    let model = ValidationModel::builder("signup")
        .field("age", resolved_then_min())
        .build();
    let mut h = Harness::new(model);

    let FieldOutcome::Pending(field) = h.validator.validate_field("age", &json!(12), None) else {
        panic!("async rule must leave the field pending");
    };

    let terminal = field.peek().expect("settled during validation");
    assert!(!terminal.valid);
    assert_eq!(terminal.failed_rules.as_slice(), [RuleKind::Min]);
    assert_eq!(terminal.phase, ValidationPhase::Done);

    let states = h.field_states("age");
    assert_eq!(states.len(), 2);
    assert!(states.iter().all(|state| !state.valid));
}

#[test]
fn early_resolved_async_rule_does_not_rescue_the_form() {
    let model = ValidationModel::builder("signup")
        .field("age", resolved_then_min())
        .build();
    let h = Harness::new(model);

    let pending = pending(h.validator.validate_form(&FormData::new().with("age", json!(12))));

    assert_eq!(pending.peek().map(|r| r.valid), Some(false));
}

#[test]
fn failing_model_check_rejects_async_form_immediately() {
    let parked = Parked::new();
    let model = ValidationModel::builder("signup")
        .field("username", FieldModel::new().rule(parked.rule()))
        .validate(|_: &dyn ValueSource| FormCheck::fail("Closed for signups"))
        .build();
    let h = Harness::new(model);

    let pending = pending(
        h.validator
            .validate_form(&FormData::new().with("username", json!("neo"))),
    );

    assert_eq!(
        pending.peek().map(|r| r.message),
        Some("Closed for signups".to_owned())
    );
}

#[test]
fn model_async_check_runs_without_async_fields() {
    let server = Parked::new();
    let model = ValidationModel::builder("signup")
        .field("name", FieldModel::new().rule(Rule::Required))
        .validate_async(server.form_check())
        .build();
    let mut h = Harness::new(model);

    let pending = pending(
        h.validator
            .validate_form(&FormData::new().with("name", json!("neo"))),
    );
    assert_eq!(server.count(), 1);

    server.take().reject("Server unavailable".into());

    assert_eq!(
        pending.peek(),
        Some(FormResult {
            valid: false,
            is_async: true,
            message: "Server unavailable".into(),
            phase: ValidationPhase::Done,
        })
    );
    assert_eq!(h.form_states().len(), 2);
}

#[test]
fn first_rejection_wins_between_field_and_model() {
    let field = Parked::new();
    let server = Parked::new();
    let model = ValidationModel::builder("signup")
        .field("username", FieldModel::new().rule(field.rule()))
        .validate_async(server.form_check())
        .build();
    let mut h = Harness::new(model);

    let pending = pending(
        h.validator
            .validate_form(&FormData::new().with("username", json!("neo"))),
    );

    server.take().reject("from the form".into());
    field.take().reject("from the field".into());

    assert_eq!(pending.peek().unwrap().message, "from the form");
    let states = h.form_states();
    assert_eq!(states.len(), 2);
    assert_eq!(states[1].message, "from the form");
}

#[test]
fn unnamed_and_unconfigured_fields_are_skipped() {
    let model = ValidationModel::builder("signup")
        .field("name", FieldModel::new().rule(Rule::Required))
        .build();
    let mut h = Harness::new(model);
    let form = FormData::new()
        .with("", json!(""))
        .with("name", json!("neo"))
        .with("comment", json!(""));

    let report = settled(h.validator.validate_form(&form));

    assert!(report.result.valid);
    assert_eq!(h.field_states("name").len(), 1);
}

#[test]
fn form_request_dispatches_to_form_validation() {
    let model = ValidationModel::builder("signup")
        .field("name", FieldModel::new().rule(Rule::Required))
        .build();
    let h = Harness::new(model);
    let form = FormData::new().with("name", json!(""));

    let Ok(Outcome::Form(outcome)) = h.validator.handle(ValidationRequest::form(&form)) else {
        panic!("expected a form outcome");
    };
    assert!(!settled(outcome).result.valid);
}
