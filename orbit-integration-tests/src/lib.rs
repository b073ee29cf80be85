//! Integration tests for `Orbit`
//!
//! This crate contains integration tests that verify the interaction between
//! the core routers, the in-memory store, the test utilities and the task
//! tracker example.

// This is a test-only crate
#![cfg(test)]
