//! Example applications built on `Orbit`
//!
//! Each module wires the command registry, the intent router and the event
//! bus together the way a small interactive tool would.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// These are examples, so we don't need to be as pedantic
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::use_self)]

/// Task tracker: a focus shell that creates tasks through intents and keeps
/// its task list in sync with the event history
pub mod tasks;
