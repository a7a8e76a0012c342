//! Prelude module for convenient imports.
//!
//! Provides a single `use formguard_validator::prelude::*;` import that
//! brings in the engine, model builders, rules and result types.
//!
//! # Examples
//!
//! ```
//! use formguard_validator::prelude::*;
//!
//! let engine = Engine::new();
//! let model = ValidationModel::builder("login")
//!     .field("email", FieldModel::new().rule(Rule::Required))
//!     .build();
//! # let _ = (engine, model);
//! ```

// ============================================================================
// ENGINE: binding, requests, outcomes
// ============================================================================

pub use crate::engine::{Engine, EngineBuilder, FormValidator, Outcome, ValidationRequest};
pub use crate::field::{FieldOutcome, PendingField};
pub use crate::form::{FormOutcome, PendingForm};

// ============================================================================
// MODEL: rules, handlers, loading
// ============================================================================

pub use crate::model::{FieldModel, FormCheck, Handlers, ModelLoader, ValidationModel};
pub use crate::rules::{Rule, RuleKind, RuleOutcome};

// ============================================================================
// RESULTS AND EVENTS
// ============================================================================

pub use crate::deferred::{Deferred, Settler};
pub use crate::event::{EventSink, NoopSink, ValidationEvent};
pub use crate::result::{FieldResult, FormReport, FormResult, Rejection, ValidationPhase};
pub use crate::source::{FormData, GroupMember, ValueSource};

// ============================================================================
// CONFIGURATION AND ERRORS
// ============================================================================

pub use crate::config::{EngineConfig, RulePolicy};
pub use crate::error::{ConfigError, EngineError};
