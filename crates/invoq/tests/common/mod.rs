//! Shared test utilities for invoq integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring the pipeline to an in-memory database and fakes
//! - Builders for provider payloads and verification edits

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
