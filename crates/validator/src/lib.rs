//! # formguard-validator
//!
//! Declarative field and form validation with synchronous and deferred
//! rules.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use formguard_validator::prelude::*;
//! use serde_json::json;
//!
//! let model = ValidationModel::builder("signup")
//!     .field("terms", FieldModel::new().rule(Rule::Acceptance))
//!     .build();
//! let validator = Engine::new().bind("signup-form", Arc::new(model), Arc::new(NoopSink));
//!
//! let form = FormData::new().with("terms", json!(false));
//! let FormOutcome::Settled(report) = validator.validate_form(&form) else {
//!     unreachable!("no async rules");
//! };
//! assert!(!report.result.valid);
//! ```
//!
//! ## Layout
//!
//! - [`rules`]: the closed rule set and the [`RuleCatalog`](rules::RuleCatalog)
//!   that evaluates it
//! - [`messages`]: failure message templates and resolution
//! - [`field`]: runs one field's rules
//! - [`form`]: combines a form's fields, sync and async, into one verdict
//! - [`event`]: announcements to an [`EventSink`](event::EventSink)
//! - [`deferred`]: the future-with-external-settlement used for async checks
//! - [`model`]: validation models, handler registry and JSON loading
//!
//! Validation failures are data ([`FieldResult`](result::FieldResult),
//! [`FormResult`](result::FormResult)), never errors.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod event;
pub mod field;
pub mod form;
pub mod messages;
pub mod model;
pub mod prelude;
pub mod result;
pub mod rules;
pub mod source;
pub mod value;
