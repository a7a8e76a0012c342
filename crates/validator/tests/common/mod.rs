//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use formguard_eventbus::{EventBus, EventSubscriber};
use formguard_validator::prelude::*;
use parking_lot::Mutex;

/// A validator bound to an event bus, plus a subscriber to that bus.
pub struct Harness {
    pub validator: FormValidator,
    pub events: EventSubscriber<ValidationEvent>,
}

impl Harness {
    pub fn new(model: ValidationModel) -> Self {
        Self::with_engine(&Engine::new(), model)
    }

    pub fn with_engine(engine: &Engine, model: ValidationModel) -> Self {
        let bus: Arc<EventBus<ValidationEvent>> = Arc::new(EventBus::new(64));
        let mut events = bus.subscribe();
        let validator = engine.bind("test-form", Arc::new(model), bus);
        // Drop the default-state announcement made by `bind`.
        events.drain();
        Self { validator, events }
    }

    /// Announced states for `field`, in order.
    pub fn field_states(&mut self, field: &str) -> Vec<FieldResult> {
        self.events
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                ValidationEvent::FieldValidation {
                    field_name, state, ..
                } if field_name == field => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Announced form states, in order. Field announcements are discarded.
    pub fn form_states(&mut self) -> Vec<FormResult> {
        self.events
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                ValidationEvent::FormValidation { state, .. } => Some(state),
                _ => None,
            })
            .collect()
    }
}

/// An async check that parks every settler it is handed, so the test
/// decides when and how each check settles.
#[derive(Clone, Default)]
pub struct Parked {
    settlers: Arc<Mutex<Vec<Settler<(), Rejection>>>>,
}

impl Parked {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(&self) -> Rule {
        let settlers = Arc::clone(&self.settlers);
        Rule::async_check(move |_, settler| settlers.lock().push(settler))
    }

    pub fn form_check(
        &self,
    ) -> impl Fn(&dyn ValueSource, Settler<(), Rejection>) + Send + Sync + 'static {
        let settlers = Arc::clone(&self.settlers);
        move |_: &dyn ValueSource, settler: Settler<(), Rejection>| settlers.lock().push(settler)
    }

    pub fn count(&self) -> usize {
        self.settlers.lock().len()
    }

    /// Takes the oldest parked settler.
    pub fn take(&self) -> Settler<(), Rejection> {
        self.settlers.lock().remove(0)
    }
}
