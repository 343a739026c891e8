//! Structural validation against a directory of XSD schemas
//!
//! Architecture: Anti-Corruption Layer - The schema engine is hidden behind a narrow trait
//! - Validator diagnostics are translated into schema Findings with positions
//! - Missing or unusable schemas degrade to a single informational finding
//! - The libxml2 backend is only compiled with the `xsd` feature

use crate::domain::{Finding, Position, Severity};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Message used when no schema set is available
pub const NO_SCHEMAS_MESSAGE: &str = "No XSD schemas found. Skipping XSD validation.";

/// Message used when the crate was built without a schema backend
pub const BACKEND_MISSING_MESSAGE: &str =
    "XSD support is not compiled in (build with the `xsd` feature). Skipping XSD validation.";

/// A structural validator for raw document text
pub trait SchemaValidator: Send + Sync {
    /// Validate the document and return schema findings in validator order
    fn validate(&self, source: &str) -> Vec<Finding>;
}

/// Validator that never reports anything, for rules-only runs and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl SchemaValidator for NoopValidator {
    fn validate(&self, _source: &str) -> Vec<Finding> {
        Vec::new()
    }
}

/// XSD schema set discovered on disk
#[derive(Debug, Clone, Default)]
pub struct XsdValidator {
    schemas: Vec<PathBuf>,
    entry: Option<PathBuf>,
}

impl XsdValidator {
    /// Discover `*.xsd` files below `directory`.
    ///
    /// A missing directory yields an empty schema set. The entry schema is `entry` (relative to
    /// `directory`) when given, else the first file whose name contains `Invoice`, else the
    /// first file in sorted order.
    pub fn from_directory(directory: impl AsRef<Path>, entry: Option<&str>) -> Self {
        let directory = directory.as_ref();
        let schemas = discover_schemas(directory);

        let entry = match entry {
            Some(name) => {
                let path = directory.join(name);
                if path.is_file() {
                    Some(path)
                } else {
                    tracing::warn!("Configured entry schema {} does not exist", path.display());
                    None
                }
            }
            None => schemas
                .iter()
                .find(|path| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().contains("Invoice"))
                        .unwrap_or(false)
                })
                .or_else(|| schemas.first())
                .cloned(),
        };

        tracing::debug!(
            "Discovered {} schema files in {} (entry: {:?})",
            schemas.len(),
            directory.display(),
            entry
        );

        Self { schemas, entry }
    }

    /// All discovered schema files, sorted
    pub fn schemas(&self) -> &[PathBuf] {
        &self.schemas
    }

    /// Schema the document is validated against
    pub fn entry(&self) -> Option<&Path> {
        self.entry.as_deref()
    }

    pub fn has_schemas(&self) -> bool {
        self.entry.is_some()
    }
}

impl SchemaValidator for XsdValidator {
    fn validate(&self, source: &str) -> Vec<Finding> {
        let Some(entry) = self.entry() else {
            return vec![skipped(NO_SCHEMAS_MESSAGE)];
        };
        backend::validate(entry, source)
    }
}

fn discover_schemas(directory: &Path) -> Vec<PathBuf> {
    if !directory.is_dir() {
        return Vec::new();
    }

    let mut schemas: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("xsd"))
                .unwrap_or(false)
        })
        .collect();
    schemas.sort();
    schemas
}

fn skipped(message: &str) -> Finding {
    Finding::schema(Severity::Info, message, Position::UNKNOWN)
}

#[cfg(feature = "xsd")]
mod backend {
    use super::{skipped, NO_SCHEMAS_MESSAGE};
    use crate::domain::{Finding, Position, Severity};
    use libxml::error::{StructuredError, XmlErrorLevel};
    use libxml::parser::Parser;
    use libxml::schemas::{SchemaParserContext, SchemaValidationContext};
    use std::path::Path;

    pub(super) fn validate(entry: &Path, source: &str) -> Vec<Finding> {
        let Some(entry) = entry.to_str() else {
            tracing::warn!("Schema path {} is not valid UTF-8", entry.display());
            return vec![skipped(NO_SCHEMAS_MESSAGE)];
        };

        // libxml2 contexts are not thread-safe, so each run compiles its own
        let mut parser_ctx = SchemaParserContext::from_file(entry);
        let mut validation_ctx = match SchemaValidationContext::from_parser(&mut parser_ctx) {
            Ok(ctx) => ctx,
            Err(errors) => {
                tracing::warn!("Schema {} failed to compile with {} errors", entry, errors.len());
                return vec![skipped(NO_SCHEMAS_MESSAGE)];
            }
        };

        let document = match Parser::default().parse_string(source) {
            Ok(document) => document,
            Err(e) => {
                return vec![Finding::schema(
                    Severity::Error,
                    format!("Failed to parse XML: {:?}", e),
                    Position::UNKNOWN,
                )]
            }
        };

        match validation_ctx.validate_document(&document) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.into_iter().map(to_finding).collect(),
        }
    }

    fn to_finding(error: StructuredError) -> Finding {
        let severity = match error.level {
            XmlErrorLevel::Warning => Severity::Warning,
            _ => Severity::Error,
        };
        let line = error.line.and_then(|l| u32::try_from(l).ok()).unwrap_or(0);
        let column = error.col.and_then(|c| u32::try_from(c).ok()).unwrap_or(0);
        let message = error
            .message
            .map(|m| m.trim_end().to_string())
            .unwrap_or_else(|| "Schema validation error".to_string());

        Finding::schema(severity, message, Position::new(line, column))
    }
}

#[cfg(not(feature = "xsd"))]
mod backend {
    use super::{skipped, BACKEND_MISSING_MESSAGE};
    use crate::domain::Finding;
    use std::path::Path;

    pub(super) fn validate(entry: &Path, _source: &str) -> Vec<Finding> {
        tracing::debug!("Skipping validation against {}", entry.display());
        vec![skipped(BACKEND_MISSING_MESSAGE)]
    }
}
