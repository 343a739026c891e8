//! Domain models for invoice inspection
//!
//! Architecture: Domain Layer - Pure business logic with no infrastructure dependencies
//! - Findings, rule violations and reports are the core domain values
//! - Errors describe why a run could not produce a report at all

pub mod findings;

pub use findings::*;
