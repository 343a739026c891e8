//! Report rendering in console, JSON and Markdown forms
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - Report (domain) is converted to various external representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Rendering is pure; only `write_report` touches the filesystem

use crate::domain::{InspectorError, InspectorResult, Report, ReportSummary, Severity};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

/// Supported output formats for inspection reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Console listing with optional colors
    Human,
    /// Structured form for programmatic consumption
    Json,
    /// Markdown table for review tools
    Markdown,
}

impl OutputFormat {
    /// Parse a report target prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "json" => Some(Self::Json),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Prefixes accepted in report targets
    pub fn file_prefixes() -> &'static [&'static str] {
        &["json", "md"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Main report formatter that dispatches to specific formatters
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a report in the specified format
    pub fn format_report(&self, report: &Report, format: OutputFormat) -> InspectorResult<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report)),
            OutputFormat::Json => self.format_json(report),
            OutputFormat::Markdown => Ok(self.format_markdown(report)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_to<W: Write>(
        &self,
        report: &Report,
        format: OutputFormat,
        mut writer: W,
    ) -> InspectorResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn format_human(&self, report: &Report) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n", report.file));
        output.push_str(&format!("XSD: {} findings\n", report.schema_findings.len()));
        output.push_str(&format!("Rules: {} findings\n", report.rule_violations.len()));

        for finding in &report.schema_findings {
            output.push_str(&self.format_entry("XSD", finding.severity, &finding.message, finding.line));
        }
        for violation in &report.rule_violations {
            output.push_str(&self.format_entry(
                &violation.id,
                violation.severity,
                &violation.message,
                violation.line,
            ));
        }

        output.push_str(&self.format_summary(&report.summary()));
        output
    }

    fn format_entry(&self, tag: &str, severity: Severity, message: &str, line: u32) -> String {
        if self.options.use_colors {
            let color = match severity {
                Severity::Error => "31",   // Red
                Severity::Warning => "33", // Yellow
                Severity::Info => "36",    // Cyan
            };
            format!(
                "  [{}][\x1b[{}m{}\x1b[0m] {} \x1b[2m(line {})\x1b[0m\n",
                tag,
                color,
                severity.label(),
                message,
                line
            )
        } else {
            format!("  [{}][{}] {} (line {})\n", tag, severity.label(), message, line)
        }
    }

    fn format_summary(&self, summary: &ReportSummary) -> String {
        if self.options.use_colors {
            let errors = if summary.has_errors() { "31" } else { "32" };
            let warnings = if summary.has_warnings() { "33" } else { "32" };
            format!(
                "\x1b[1mSummary:\x1b[0m errors=\x1b[{}m{}\x1b[0m, warnings=\x1b[{}m{}\x1b[0m\n",
                errors, summary.errors, warnings, summary.warnings
            )
        } else {
            format!(
                "Summary: errors={}, warnings={}\n",
                summary.errors, summary.warnings
            )
        }
    }

    fn format_json(&self, report: &Report) -> InspectorResult<String> {
        serde_json::to_string_pretty(&to_json(report))
            .map_err(|e| InspectorError::report(format!("JSON serialization failed: {}", e)))
    }

    fn format_markdown(&self, report: &Report) -> String {
        let mut md = String::new();
        md.push_str(&format!("# Report: {}\n\n", report.file));
        md.push_str("## Findings\n");
        md.push_str("| Kind | Id | Severity | Message | Line |\n");
        md.push_str("|------|----|----------|---------|------|\n");

        for finding in &report.schema_findings {
            md.push_str(&format!(
                "| XSD |  | {} | {} | {} |\n",
                finding.severity.label(),
                escape_cell(&finding.message),
                finding.line
            ));
        }
        for violation in &report.rule_violations {
            md.push_str(&format!(
                "| Rule | {} | {} | {} | {} |\n",
                violation.id,
                violation.severity.label(),
                escape_cell(&violation.message),
                violation.line
            ));
        }

        md
    }
}

/// Structured report shape shared by the JSON output and library callers
pub fn to_json(report: &Report) -> JsonValue {
    let summary = report.summary();
    serde_json::json!({
        "file": report.file,
        "xsd": { "findings": report.schema_findings },
        "rules": { "findings": report.rule_violations },
        "summary": {
            "errors": summary.errors,
            "warnings": summary.warnings
        }
    })
}

/// Keep a message inside one table cell
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// A report file destination written as `json:<path>` or `md:<path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    pub format: OutputFormat,
    pub path: PathBuf,
}

impl ReportTarget {
    pub fn new(format: OutputFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
        }
    }
}

impl FromStr for ReportTarget {
    type Err = InspectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, path) = s.split_once(':').ok_or_else(|| {
            InspectorError::config(format!(
                "Report target '{}' must look like json:<path> or md:<path>",
                s
            ))
        })?;

        let format = OutputFormat::from_prefix(prefix).ok_or_else(|| {
            InspectorError::config(format!(
                "Unknown report format '{}'. Available: {}",
                prefix,
                OutputFormat::file_prefixes().join(", ")
            ))
        })?;

        if path.trim().is_empty() {
            return Err(InspectorError::config(format!(
                "Report target '{}' has an empty path",
                s
            )));
        }

        Ok(Self::new(format, path))
    }
}

/// Render `report` and write it to the target, creating parent directories as needed
pub async fn write_report(
    formatter: &ReportFormatter,
    target: &ReportTarget,
    report: &Report,
) -> InspectorResult<()> {
    let rendered = formatter.format_report(report, target.format)?;

    if let Some(parent) = target.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target.path, rendered).await?;

    tracing::info!("Report written to {}", target.path.display());
    Ok(())
}

/// Which diagnostics turn into a failing exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailOn {
    /// Always succeed
    None,
    /// Fail on any warning or error
    Warn,
    /// Fail on errors only
    #[default]
    Error,
}

impl FailOn {
    /// Process exit status for a report summary: 0 pass, 1 warning gate, 2 error gate
    pub fn exit_code(self, summary: &ReportSummary) -> i32 {
        match self {
            Self::None => 0,
            Self::Warn if summary.has_errors() || summary.has_warnings() => 1,
            Self::Error if summary.has_errors() => 2,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Finding, Position, RuleViolation};
    use tempfile::TempDir;

    fn create_test_report() -> Report {
        Report::new(
            "invoices/a.xml",
            vec![Finding::schema(
                Severity::Warning,
                "Element 'Note' is unexpected",
                Position::new(4, 3),
            )],
            vec![
                RuleViolation::new(
                    "SUM-001",
                    Severity::Error,
                    "LineExtensionAmount total 99.00 does not match header 100.00",
                )
                .at(Position::new(2, 2)),
                RuleViolation::new("VAT-002", Severity::Error, "Line 1 | 2\nmissing code")
                    .at(Position::new(12, 4)),
            ],
        )
    }

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions { use_colors: false })
    }

    #[test]
    fn test_human_format() {
        let output = plain()
            .format_report(&create_test_report(), OutputFormat::Human)
            .unwrap();
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines[0], "invoices/a.xml");
        assert_eq!(lines[1], "XSD: 1 findings");
        assert_eq!(lines[2], "Rules: 2 findings");
        assert_eq!(lines[3], "  [XSD][Warning] Element 'Note' is unexpected (line 4)");
        assert!(lines[4].starts_with("  [SUM-001][Error] LineExtensionAmount total 99.00"));
        assert!(output.ends_with("Summary: errors=2, warnings=1\n"));
    }

    #[test]
    fn test_human_format_with_colors() {
        let output = ReportFormatter::default()
            .format_report(&create_test_report(), OutputFormat::Human)
            .unwrap();
        assert!(output.contains("\x1b[31mError\x1b[0m"));
        assert!(output.contains("Summary:"));
    }

    #[test]
    fn test_json_format() {
        let output = plain()
            .format_report(&create_test_report(), OutputFormat::Json)
            .unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();

        assert_eq!(json["file"], "invoices/a.xml");
        assert_eq!(json["xsd"]["findings"].as_array().unwrap().len(), 1);
        assert_eq!(json["xsd"]["findings"][0]["kind"], "Schema");
        assert_eq!(json["xsd"]["findings"][0]["severity"], "warning");
        assert_eq!(json["rules"]["findings"].as_array().unwrap().len(), 2);
        assert_eq!(json["rules"]["findings"][0]["id"], "SUM-001");
        assert_eq!(json["rules"]["findings"][1]["line"], 12);
        assert_eq!(json["summary"]["errors"], 2);
        assert_eq!(json["summary"]["warnings"], 1);
    }

    #[test]
    fn test_markdown_format() {
        let output = plain()
            .format_report(&create_test_report(), OutputFormat::Markdown)
            .unwrap();
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines[0], "# Report: invoices/a.xml");
        assert_eq!(lines[2], "## Findings");
        assert_eq!(lines[3], "| Kind | Id | Severity | Message | Line |");
        assert_eq!(lines[5], "| XSD |  | Warning | Element 'Note' is unexpected | 4 |");
        assert!(lines[6].starts_with("| Rule | SUM-001 | Error |"));
        assert_eq!(lines[7], "| Rule | VAT-002 | Error | Line 1 \\| 2 missing code | 12 |");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_rendering_does_not_mutate_report() {
        let report = create_test_report();
        let before = report.clone();
        for format in [OutputFormat::Human, OutputFormat::Json, OutputFormat::Markdown] {
            plain().format_report(&report, format).unwrap();
        }
        assert_eq!(report, before);
    }

    #[test]
    fn test_report_target_parsing() {
        let json: ReportTarget = "json:out/report.json".parse().unwrap();
        assert_eq!(json, ReportTarget::new(OutputFormat::Json, "out/report.json"));

        let md: ReportTarget = "md:C:/reports/r.md".parse().unwrap();
        assert_eq!(md.format, OutputFormat::Markdown);
        assert_eq!(md.path, PathBuf::from("C:/reports/r.md"));

        for bad in ["yaml:out.yaml", "json", "md:", "JSON:x.json"] {
            let err = bad.parse::<ReportTarget>().unwrap_err();
            assert!(matches!(err, InspectorError::Configuration { .. }), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_write_report_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/deeper/report.json");
        let target = ReportTarget::new(OutputFormat::Json, &path);

        write_report(&plain(), &target, &create_test_report())
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let json: JsonValue = serde_json::from_str(&written).unwrap();
        assert_eq!(json["summary"]["errors"], 2);
    }

    #[test]
    fn test_fail_on_exit_codes() {
        let clean = ReportSummary::default();
        let warnings = ReportSummary { errors: 0, warnings: 2 };
        let errors = ReportSummary { errors: 1, warnings: 0 };

        assert_eq!(FailOn::None.exit_code(&errors), 0);
        assert_eq!(FailOn::Warn.exit_code(&clean), 0);
        assert_eq!(FailOn::Warn.exit_code(&warnings), 1);
        assert_eq!(FailOn::Warn.exit_code(&errors), 1);
        assert_eq!(FailOn::Error.exit_code(&warnings), 0);
        assert_eq!(FailOn::Error.exit_code(&errors), 2);
        assert_eq!(FailOn::default(), FailOn::Error);
    }

    #[test]
    fn test_write_to_matches_format_report() {
        let formatter = plain();
        let report = create_test_report();

        let mut buffer = Vec::new();
        formatter
            .write_to(&report, OutputFormat::Markdown, &mut buffer)
            .unwrap();

        let expected = formatter.format_report(&report, OutputFormat::Markdown).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), expected);
    }
}
