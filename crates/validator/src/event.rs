//! Event channel: outward announcements of validation state.
//!
//! The engine constructs and emits three announcement shapes and never
//! reads anything back. Each announcement is a self-contained delta keyed
//! by component, model and field; merging concurrent announcements for the
//! same key is the receiver's job.
//!
//! [`EventSink`] is the seam. The default transport is
//! [`EventBus<ValidationEvent>`], which fans announcements out to any number
//! of subscribers.

use std::sync::Arc;

use formguard_eventbus::EventBus;
use serde::{Deserialize, Serialize};

use crate::result::{FieldResult, FormResult};

/// One announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValidationEvent {
    /// A component was bound to a model; its fields start out unvalidated.
    #[serde(rename = "fieldDefaultState")]
    DefaultState {
        /// Component identity.
        component: String,
        /// Model name.
        model: String,
    },
    /// A field's state changed.
    #[serde(rename_all = "camelCase")]
    FieldValidation {
        /// Component identity.
        component: String,
        /// Model name.
        model: String,
        /// Field name.
        field_name: String,
        /// The field's new state.
        state: FieldResult,
    },
    /// The form's state changed.
    FormValidation {
        /// Component identity.
        component: String,
        /// Model name.
        model: String,
        /// The form's new state.
        state: FormResult,
    },
}

impl ValidationEvent {
    /// The component the announcement is keyed by.
    #[must_use]
    pub fn component(&self) -> &str {
        match self {
            Self::DefaultState { component, .. }
            | Self::FieldValidation { component, .. }
            | Self::FormValidation { component, .. } => component,
        }
    }
}

/// Receiver of announcements.
///
/// Implementations must not block: announcements are made inline, on
/// whatever thread runs validation or settles an async check.
pub trait EventSink: Send + Sync {
    /// Receives one announcement.
    fn announce(&self, event: ValidationEvent);
}

impl EventSink for EventBus<ValidationEvent> {
    fn announce(&self, event: ValidationEvent) {
        self.emit(event);
    }
}

/// A sink that drops every announcement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn announce(&self, _event: ValidationEvent) {}
}

/// Announcement helper bound to one component and model.
#[derive(Clone)]
pub(crate) struct Announcer {
    sink: Arc<dyn EventSink>,
    component: Arc<str>,
    model: Arc<str>,
}

impl Announcer {
    pub(crate) fn new(sink: Arc<dyn EventSink>, component: &str, model: &str) -> Self {
        Self {
            sink,
            component: Arc::from(component),
            model: Arc::from(model),
        }
    }

    pub(crate) fn default_state(&self) {
        self.sink.announce(ValidationEvent::DefaultState {
            component: self.component.to_string(),
            model: self.model.to_string(),
        });
    }

    pub(crate) fn field(&self, field: &str, state: &FieldResult) {
        tracing::debug!(
            component = %self.component,
            field,
            valid = state.valid,
            phase = ?state.phase,
            "field state announced"
        );
        self.sink.announce(ValidationEvent::FieldValidation {
            component: self.component.to_string(),
            model: self.model.to_string(),
            field_name: field.to_owned(),
            state: state.clone(),
        });
    }

    pub(crate) fn form(&self, state: &FormResult) {
        tracing::debug!(
            component = %self.component,
            valid = state.valid,
            phase = ?state.phase,
            "form state announced"
        );
        self.sink.announce(ValidationEvent::FormValidation {
            component: self.component.to_string(),
            model: self.model.to_string(),
            state: state.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn bus_sink_delivers_to_subscribers() {
        let bus: Arc<EventBus<ValidationEvent>> = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let announcer = Announcer::new(bus, "signup-form", "signup");

        announcer.default_state();
        announcer.field("age", &FieldResult::valid(json!("21")));

        let events = rx.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            ValidationEvent::DefaultState {
                component: "signup-form".into(),
                model: "signup".into(),
            }
        );
        assert!(matches!(
            &events[1],
            ValidationEvent::FieldValidation { field_name, .. } if field_name == "age"
        ));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ValidationEvent::FieldValidation {
            component: "c".into(),
            model: "m".into(),
            field_name: "age".into(),
            state: FieldResult::valid(json!(20)),
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], json!("fieldValidation"));
        assert_eq!(value["fieldName"], json!("age"));
        assert_eq!(value["state"]["valid"], json!(true));
    }
}
