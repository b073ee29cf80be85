//! Test utilities for `Orbit`
//!
//! - [`recording::RecordingListener`] collects deliveries for assertions
//! - [`terminal::ScriptedTerminal`] feeds a command session from a script
//! - [`chaos::ChaosEventStore`] injects store failures
//! - [`contract`] holds the behavioral suite every event store must pass

#![forbid(
    invalid_value,
    overflowing_literals,
    unconditional_recursion,
    unused_allocation,
    unsafe_code
)]
#![deny(
    bad_style,
    deprecated,
    meta_variable_misuse,
    non_ascii_idents,
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    rust_2018_idioms,
    trivial_numeric_casts,
    unreachable_code,
    unused_assignments,
    unused_attributes,
    unused_extern_crates,
    unused_imports,
    unused_must_use,
    unused_mut,
    unused_parens,
    unused_variables
)]

pub mod chaos;
pub mod contract;
pub mod recording;
pub mod terminal;

pub use chaos::*;
pub use recording::*;
pub use terminal::*;
