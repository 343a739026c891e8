//! Core domain models for invoice diagnostics and inspection reports
//!
//! Architecture: Rich Domain Models - Findings are values with behavior, not just data
//! - Schema findings and rule violations share severity and position semantics
//! - Report acts as the aggregate root owning both diagnostic collections
//! - Summary counts are derived on demand, never stored alongside the data

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity levels for findings and rule violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages (never counted in summaries)
    Info,
    /// Problems that should be looked at but do not fail the default gate
    Warning,
    /// Problems that make the invoice unacceptable
    Error,
}

impl Severity {
    /// Whether this severity level fails the default exit gate
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Capitalized label used in console and markdown rows
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Source location of a node or diagnostic.
///
/// Lines and columns are 1-based; `(0, 0)` means unknown or synthetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Position used when no source location is available
    pub const UNKNOWN: Position = Position { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn is_known(self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Origin of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum FindingKind {
    Schema,
    Rule,
}

/// A diagnostic produced by schema validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl Finding {
    /// Create a schema finding at the given position
    pub fn schema(severity: Severity, message: impl Into<String>, position: Position) -> Self {
        Self {
            kind: FindingKind::Schema,
            severity,
            message: message.into(),
            line: position.line,
            column: position.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// A diagnostic produced by a business rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    /// Short code of the rule that produced this violation (e.g. `SUM-001`)
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl RuleViolation {
    /// Create a violation with an unknown position
    pub fn new(id: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            line: 0,
            column: 0,
        }
    }

    /// Attach a source position
    pub fn at(mut self, position: Position) -> Self {
        self.line = position.line;
        self.column = position.column;
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

/// Error and warning totals across a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl ReportSummary {
    /// Count one entry; Info is ignored
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }
}

/// Inspection result for one document: schema findings plus rule violations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Identifier of the inspected source (usually its path)
    pub file: String,
    pub schema_findings: Vec<Finding>,
    pub rule_violations: Vec<RuleViolation>,
}

impl Report {
    pub fn new(
        file: impl Into<String>,
        schema_findings: Vec<Finding>,
        rule_violations: Vec<RuleViolation>,
    ) -> Self {
        Self {
            file: file.into(),
            schema_findings,
            rule_violations,
        }
    }

    /// Error/warning counts across both collections
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for finding in &self.schema_findings {
            summary.add(finding.severity);
        }
        for violation in &self.rule_violations {
            summary.add(violation.severity);
        }
        summary
    }

    pub fn has_errors(&self) -> bool {
        self.summary().has_errors()
    }

    pub fn has_warnings(&self) -> bool {
        self.summary().has_warnings()
    }

    pub fn total_findings(&self) -> usize {
        self.schema_findings.len() + self.rule_violations.len()
    }
}

/// Error types that can occur during inspection
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    /// Configuration, profile or report target is invalid
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or written
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Input is not well-formed XML
    #[error("Document error at {position}: {message}")]
    Document { message: String, position: Position },

    /// A declared amount is present but does not follow the amount grammar
    #[error("{rule}: malformed {field} '{value}' at {position}")]
    MalformedAmount {
        rule: String,
        field: String,
        value: String,
        position: Position,
    },

    /// Summing declared amounts left the decimal range
    #[error("{rule}: {field} total overflows at '{value}' ({position})")]
    AmountOverflow {
        rule: String,
        field: String,
        value: String,
        position: Position,
    },

    /// Report could not be rendered
    #[error("Report error: {message}")]
    Report { message: String },

    /// A worker running part of the evaluation failed
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },
}

impl InspectorError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a document error
    pub fn document(message: impl Into<String>, position: Position) -> Self {
        Self::Document {
            message: message.into(),
            position,
        }
    }

    /// Create a malformed amount error
    pub fn malformed_amount(
        rule: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
        position: Position,
    ) -> Self {
        Self::MalformedAmount {
            rule: rule.into(),
            field: field.into(),
            value: value.into(),
            position,
        }
    }

    /// Create an amount overflow error
    pub fn amount_overflow(
        rule: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
        position: Position,
    ) -> Self {
        Self::AmountOverflow {
            rule: rule.into(),
            field: field.into(),
            value: value.into(),
            position,
        }
    }

    /// Create a report error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    /// Create an evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }
}

/// Result type for inspector operations
pub type InspectorResult<T> = Result<T, InspectorError>;
