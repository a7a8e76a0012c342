//! JSON line output.

use std::io::{self, Write};

use formguard_validator::event::ValidationEvent;
use formguard_validator::result::{FieldResult, FormResult};
use serde::Serialize;

#[derive(Serialize)]
struct FieldLine<'a> {
    field: &'a str,
    #[serde(flatten)]
    state: &'a FieldResult,
}

#[derive(Serialize)]
struct FormLine<'a> {
    form: &'a str,
    #[serde(flatten)]
    state: &'a FormResult,
}

/// Writes announcements and the verdict as one JSON document per line.
pub struct Reporter<W> {
    out: W,
    raw_events: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, raw_events: bool) -> Self {
        Self { out, raw_events }
    }

    /// With raw events every announcement is written as is; otherwise only
    /// final field states are.
    pub fn event(&mut self, event: &ValidationEvent) -> io::Result<()> {
        if self.raw_events {
            return self.line(event);
        }
        match event {
            ValidationEvent::FieldValidation {
                field_name, state, ..
            } if state.phase.is_final() => self.line(&FieldLine {
                field: field_name,
                state,
            }),
            _ => Ok(()),
        }
    }

    pub fn verdict(&mut self, form: &str, state: &FormResult) -> io::Result<()> {
        self.line(&FormLine { form, state })
    }

    fn line<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")
    }
}
