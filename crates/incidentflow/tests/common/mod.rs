//! Shared test utilities for incidentflow integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs against a temp upload directory and database
//! - `IncidentRow` / `SheetBuilder` for writing spreadsheets programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
