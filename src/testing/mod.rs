//! Test and harness utilities.
//!
//! Modules in this namespace are only compiled for unit tests or when the
//! `synthetic_fixtures` Cargo feature is enabled.

pub mod fixtures;
