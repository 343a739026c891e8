//! UBL Inspector - Schema and business rule validation for UBL invoices
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain logic separated from infrastructure concerns
//! - Schema validation and rule evaluation are independent collaborators
//! - The inspector wires them together and assembles one report per document

pub mod config;
pub mod document;
pub mod domain;
pub mod report;
pub mod rules;
pub mod schema;

// Re-export main types for convenient access
pub use domain::{
    Finding, FindingKind, InspectorError, InspectorResult, Position, Report, ReportSummary,
    RuleViolation, Severity,
};

pub use config::{ConfigBuilder, InspectorConfig, ProfileConfig, SchemaConfig};

pub use document::{Document, QName, XmlNode};

pub use report::{FailOn, OutputFormat, ReportFormatter, ReportOptions, ReportTarget};

pub use rules::{BusinessRule, RuleContext, RuleEngine};

pub use schema::{NoopValidator, SchemaValidator, XsdValidator};

use std::path::Path;
use std::sync::Arc;

/// Main inspector providing high-level validation operations
pub struct InvoiceInspector {
    profile: String,
    engine: Arc<RuleEngine>,
    context: RuleContext,
    schema_validator: Arc<dyn SchemaValidator>,
    report_formatter: ReportFormatter,
}

/// A document read and parsed once, shared by both validation layers
#[derive(Debug, Clone)]
pub struct LoadedInvoice {
    /// Identifier used in reports
    pub file: String,
    /// Raw text handed to the schema validator
    pub source: Arc<str>,
    /// Parsed tree handed to the rule engine
    pub document: Arc<Document>,
}

impl LoadedInvoice {
    /// Parse already-read text
    pub fn from_source(file: impl Into<String>, source: impl Into<Arc<str>>) -> InspectorResult<Self> {
        let source = source.into();
        let document = Document::parse(&source)?;
        Ok(Self {
            file: file.into(),
            source,
            document: Arc::new(document),
        })
    }
}

/// Identity of a built-in rule and whether the active profile runs it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub enabled: bool,
}

impl InvoiceInspector {
    /// Create an inspector for one profile of the given configuration
    pub fn new_with_config(config: &InspectorConfig, profile: Option<&str>) -> InspectorResult<Self> {
        config.validate()?;
        let profile_name = profile.unwrap_or(&config.default_profile).to_string();
        let profile = config.profile(Some(profile_name.as_str()))?;

        let engine = profile.build_engine()?;
        let schema_validator =
            XsdValidator::from_directory(&config.schemas.directory, config.schemas.entry.as_deref());

        tracing::debug!(
            "Profile '{}' runs {} rules (scale {}, parallel {})",
            profile_name,
            engine.len(),
            profile.scale,
            profile.parallel
        );

        Ok(Self {
            profile: profile_name,
            engine: Arc::new(engine),
            context: profile.rule_context(),
            schema_validator: Arc::new(schema_validator),
            report_formatter: ReportFormatter::default(),
        })
    }

    /// Create an inspector with default configuration
    pub fn new() -> InspectorResult<Self> {
        Self::new_with_config(&InspectorConfig::default(), None)
    }

    /// Create an inspector loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P, profile: Option<&str>) -> InspectorResult<Self> {
        let config = InspectorConfig::load_from_file(path)?;
        Self::new_with_config(&config, profile)
    }

    /// Replace the schema validator
    pub fn with_schema_validator<V: SchemaValidator + 'static>(mut self, validator: V) -> Self {
        self.schema_validator = Arc::new(validator);
        self
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn rule_context(&self) -> RuleContext {
        self.context
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Read and parse a document once
    pub async fn load<P: AsRef<Path>>(&self, path: P) -> InspectorResult<LoadedInvoice> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path).await?;
        tracing::debug!("Read {} bytes from {}", source.len(), path.display());
        LoadedInvoice::from_source(path.display().to_string(), source)
    }

    /// Schema validation plus business rules, run concurrently
    pub async fn check<P: AsRef<Path>>(&self, path: P) -> InspectorResult<Report> {
        let invoice = self.load(path).await?;
        tracing::info!("Checking {} with profile '{}'", invoice.file, self.profile);

        let (schema_findings, rule_violations) = tokio::join!(
            self.spawn_schema(&invoice),
            self.spawn_rules(&invoice)
        );

        Ok(Report::new(invoice.file, schema_findings?, rule_violations?))
    }

    /// Schema validation only
    pub async fn validate_schema<P: AsRef<Path>>(&self, path: P) -> InspectorResult<Report> {
        let invoice = self.load(path).await?;
        tracing::info!("Validating {} against schemas", invoice.file);

        let schema_findings = self.spawn_schema(&invoice).await?;
        Ok(Report::new(invoice.file, schema_findings, Vec::new()))
    }

    /// Business rules only
    pub async fn evaluate_rules<P: AsRef<Path>>(&self, path: P) -> InspectorResult<Report> {
        let invoice = self.load(path).await?;
        tracing::info!("Evaluating rules on {} with profile '{}'", invoice.file, self.profile);

        let rule_violations = self.spawn_rules(&invoice).await?;
        Ok(Report::new(invoice.file, Vec::new(), rule_violations))
    }

    /// Synchronous check of an already-loaded document
    pub fn check_loaded(&self, invoice: &LoadedInvoice) -> InspectorResult<Report> {
        let schema_findings = self.schema_validator.validate(&invoice.source);
        let rule_violations = self.engine.evaluate_all(&invoice.document, &self.context)?;
        Ok(Report::new(invoice.file.clone(), schema_findings, rule_violations))
    }

    /// Format a report for output
    pub fn format_report(&self, report: &Report, format: OutputFormat) -> InspectorResult<String> {
        self.report_formatter.format_report(report, format)
    }

    /// Format a report straight into a writer
    pub fn write_report_to<W: std::io::Write>(
        &self,
        report: &Report,
        format: OutputFormat,
        writer: W,
    ) -> InspectorResult<()> {
        self.report_formatter.write_to(report, format, writer)
    }

    /// Describe a built-in rule
    pub fn explain(&self, rule_id: &str) -> Option<RuleInfo> {
        rules::builtin_rule(rule_id).map(|rule| RuleInfo {
            id: rule.id(),
            title: rule.title(),
            enabled: self.engine.rule(rule.id()).is_some(),
        })
    }

    /// All built-in rules in catalogue order
    pub fn rule_catalogue(&self) -> Vec<RuleInfo> {
        rules::BUILTIN_RULE_IDS
            .iter()
            .filter_map(|id| self.explain(id))
            .collect()
    }

    async fn spawn_schema(&self, invoice: &LoadedInvoice) -> InspectorResult<Vec<Finding>> {
        let validator = Arc::clone(&self.schema_validator);
        let source = Arc::clone(&invoice.source);

        let findings = tokio::task::spawn_blocking(move || validator.validate(&source))
            .await
            .map_err(|e| InspectorError::evaluation(format!("Schema worker failed: {e}")))?;

        tracing::debug!("Schema validation produced {} findings", findings.len());
        Ok(findings)
    }

    async fn spawn_rules(&self, invoice: &LoadedInvoice) -> InspectorResult<Vec<RuleViolation>> {
        let engine = Arc::clone(&self.engine);
        let document = Arc::clone(&invoice.document);
        let context = self.context;

        let violations =
            tokio::task::spawn_blocking(move || engine.evaluate_all(&document, &context))
                .await
                .map_err(|e| InspectorError::evaluation(format!("Rule worker failed: {e}")))??;

        tracing::debug!("Rule evaluation produced {} violations", violations.len());
        Ok(violations)
    }
}

/// Convenience function to create an inspector with default settings
pub fn create_inspector() -> InspectorResult<InvoiceInspector> {
    InvoiceInspector::new()
}

/// Convenience function to check one file with default settings
pub async fn check_file<P: AsRef<Path>>(path: P) -> InspectorResult<Report> {
    InvoiceInspector::new()?.check(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const INVOICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Invoice xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2"
         xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
         xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
  <cbc:ID>INV-1</cbc:ID>
  <cac:LegalMonetaryTotal>
    <cbc:LineExtensionAmount currencyID="TRY">100.00</cbc:LineExtensionAmount>
  </cac:LegalMonetaryTotal>
  <cac:InvoiceLine>
    <cbc:ID>1</cbc:ID>
    <cbc:LineExtensionAmount currencyID="TRY">60.00</cbc:LineExtensionAmount>
    <cac:TaxTotal><cac:TaxSubtotal><cac:TaxCategory>
      <cbc:Percent>0</cbc:Percent>
    </cac:TaxCategory></cac:TaxSubtotal></cac:TaxTotal>
  </cac:InvoiceLine>
  <cac:InvoiceLine>
    <cbc:ID>2</cbc:ID>
    <cbc:LineExtensionAmount currencyID="JPY">39.5</cbc:LineExtensionAmount>
  </cac:InvoiceLine>
</Invoice>
"#;

    struct FixedSchema(Vec<Finding>);

    impl SchemaValidator for FixedSchema {
        fn validate(&self, _source: &str) -> Vec<Finding> {
            self.0.clone()
        }
    }

    fn write_invoice(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("invoice.xml");
        fs::write(&path, content).unwrap();
        path
    }

    fn inspector() -> InvoiceInspector {
        InvoiceInspector::new()
            .unwrap()
            .with_schema_validator(FixedSchema(vec![Finding::schema(
                Severity::Warning,
                "schema note",
                Position::new(3, 1),
            )]))
    }

    #[tokio::test]
    async fn test_check_combines_both_layers() {
        let temp = TempDir::new().unwrap();
        let path = write_invoice(&temp, INVOICE);

        let report = inspector().check(&path).await.unwrap();

        assert_eq!(report.file, path.display().to_string());
        assert_eq!(report.schema_findings.len(), 1);
        let ids: Vec<_> = report.rule_violations.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["SUM-001", "VAT-002", "CUR-001"]);
        assert_eq!(report.summary(), ReportSummary { errors: 3, warnings: 1 });
    }

    #[tokio::test]
    async fn test_validate_schema_only() {
        let temp = TempDir::new().unwrap();
        let path = write_invoice(&temp, INVOICE);

        let report = inspector().validate_schema(&path).await.unwrap();
        assert_eq!(report.schema_findings.len(), 1);
        assert!(report.rule_violations.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_rules_only() {
        let temp = TempDir::new().unwrap();
        let path = write_invoice(&temp, INVOICE);

        let report = inspector().evaluate_rules(&path).await.unwrap();
        assert!(report.schema_findings.is_empty());
        assert_eq!(report.rule_violations.len(), 3);
    }

    #[tokio::test]
    async fn test_check_matches_synchronous_path() {
        let temp = TempDir::new().unwrap();
        let path = write_invoice(&temp, INVOICE);
        let inspector = inspector();

        let invoice = inspector.load(&path).await.unwrap();
        let sync = inspector.check_loaded(&invoice).unwrap();
        let concurrent = inspector.check(&path).await.unwrap();
        assert_eq!(sync, concurrent);
    }

    #[tokio::test]
    async fn test_malformed_amount_aborts_run() {
        let temp = TempDir::new().unwrap();
        let path = write_invoice(&temp, &INVOICE.replace("60.00", "60,00"));

        let result = inspector().check(&path).await;
        assert!(matches!(result, Err(InspectorError::MalformedAmount { .. })));
    }

    #[tokio::test]
    async fn test_malformed_document_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = write_invoice(&temp, "<Invoice><cbc:ID>1</Invoice>");
        assert!(matches!(
            inspector().check(&path).await,
            Err(InspectorError::Document { .. })
        ));

        let missing = temp.path().join("missing.xml");
        assert!(matches!(
            inspector().check(&missing).await,
            Err(InspectorError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_profile_selects_rules() {
        let config = ConfigBuilder::new()
            .add_profile(
                "currency",
                ProfileConfig {
                    scale: 2,
                    rules: vec!["CUR-001".to_string()],
                    parallel: true,
                },
            )
            .build()
            .unwrap();
        let inspector = InvoiceInspector::new_with_config(&config, Some("currency"))
            .unwrap()
            .with_schema_validator(NoopValidator);

        let temp = TempDir::new().unwrap();
        let path = write_invoice(&temp, INVOICE);
        let report = inspector.check(&path).await.unwrap();

        assert_eq!(inspector.profile(), "currency");
        assert_eq!(report.rule_violations.len(), 1);
        assert_eq!(report.rule_violations[0].id, "CUR-001");

        assert!(InvoiceInspector::new_with_config(&config, Some("missing")).is_err());
    }

    #[test]
    fn test_explain_and_catalogue() {
        let config = ConfigBuilder::new()
            .add_profile(
                "totals",
                ProfileConfig {
                    rules: vec!["SUM-001".to_string()],
                    ..Default::default()
                },
            )
            .default_profile("totals")
            .build()
            .unwrap();
        let inspector = InvoiceInspector::new_with_config(&config, None).unwrap();

        let sum = inspector.explain("SUM-001").unwrap();
        assert!(sum.enabled);
        assert!(sum.title.contains("LegalMonetaryTotal"));
        assert!(!inspector.explain("VAT-002").unwrap().enabled);
        assert!(inspector.explain("XYZ-001").is_none());

        let ids: Vec<_> = inspector.rule_catalogue().iter().map(|r| r.id).collect();
        assert_eq!(ids, rules::BUILTIN_RULE_IDS);
    }

    #[test]
    fn test_format_report() {
        let invoice = LoadedInvoice::from_source("inline.xml", INVOICE).unwrap();
        let inspector = inspector().with_report_formatter(ReportFormatter::new(ReportOptions {
            use_colors: false,
        }));
        let report = inspector.check_loaded(&invoice).unwrap();

        let human = inspector.format_report(&report, OutputFormat::Human).unwrap();
        assert!(human.starts_with("inline.xml\n"));
        assert!(human.contains("[VAT-002][Error] Line 1"));
        assert!(human.contains("Summary: errors=3, warnings=1"));

        let mut written = Vec::new();
        inspector
            .write_report_to(&report, OutputFormat::Human, &mut written)
            .unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), human);
    }
}
