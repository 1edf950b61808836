//! Shared harness for the end-to-end test suites.

pub mod containers;
pub mod fixtures;
pub mod setup;
