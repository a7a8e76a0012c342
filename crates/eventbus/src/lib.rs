#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Formguard Event Bus
//!
//! Generic broadcast event distribution for Formguard.
//!
//! - [`EventBus`] -- fan-out delivery of any cloneable event type
//! - [`EventSubscriber`] -- receiving side, with lag accounting
//!
//! Events are **projections**: a subscriber that falls behind skips the
//! oldest events instead of blocking the emitter.

pub mod bus;

pub use bus::{EventBus, EventSubscriber};
