//! Shared fixtures and an in-memory filter evaluator for tests.

pub mod fixtures;
pub mod matcher;
