//! VAT-002: zero-rated lines must declare a tax exemption reason code

use super::amount::parse_amount;
use super::{BusinessRule, RuleContext};
use crate::document::ubl::{CAC, CBC};
use crate::document::{Document, XmlNode};
use crate::domain::{InspectorResult, RuleViolation, Severity};
use rust_decimal::Decimal;

/// A line whose tax category percent is exactly zero needs a `TaxExemptionReasonCode`
/// under one of its tax categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroRateExemptionRule;

impl ZeroRateExemptionRule {
    pub const ID: &'static str = "VAT-002";

    /// First `TaxCategory/Percent` under the line; unparsable or blank rates yield `None`
    fn line_rate(line: &XmlNode) -> Option<Decimal> {
        let percent = line
            .descendants_named(CAC, "TaxCategory")
            .flat_map(|category| category.children_named(CBC, "Percent"))
            .next()?;
        parse_amount(&percent.value())
    }

    fn has_exemption(line: &XmlNode) -> bool {
        line.descendants_named(CAC, "TaxCategory")
            .any(|category| category.child(CBC, "TaxExemptionReasonCode").is_some())
    }
}

impl BusinessRule for ZeroRateExemptionRule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn title(&self) -> &'static str {
        "TaxExemptionReasonCode is required when the VAT rate is 0%"
    }

    fn evaluate(
        &self,
        document: &Document,
        _context: &RuleContext,
    ) -> InspectorResult<Vec<RuleViolation>> {
        let mut violations = Vec::new();

        for line in document.root().descendants_named(CAC, "InvoiceLine") {
            let Some(rate) = Self::line_rate(line) else {
                continue;
            };
            if !rate.is_zero() || Self::has_exemption(line) {
                continue;
            }

            let line_id = line
                .child(CBC, "ID")
                .map(|id| id.value().into_owned())
                .unwrap_or_else(|| "?".to_string());
            violations.push(
                RuleViolation::new(
                    Self::ID,
                    Severity::Error,
                    format!("Line {line_id}: TaxExemptionReasonCode is missing for a 0% VAT rate"),
                )
                .at(line.position),
            );
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Position;
    use crate::rules::fixtures::{invoice, BODY_FIRST_LINE};

    fn line(id: Option<&str>, tax: &str) -> String {
        let id = id
            .map(|id| format!("<cbc:ID>{id}</cbc:ID>"))
            .unwrap_or_default();
        format!("<cac:InvoiceLine>{id}<cac:TaxTotal><cac:TaxSubtotal>{tax}</cac:TaxSubtotal></cac:TaxTotal></cac:InvoiceLine>\n")
    }

    fn category(percent: &str, exemption: Option<&str>) -> String {
        let exemption = exemption
            .map(|code| format!("<cbc:TaxExemptionReasonCode>{code}</cbc:TaxExemptionReasonCode>"))
            .unwrap_or_default();
        format!("<cac:TaxCategory><cbc:Percent>{percent}</cbc:Percent>{exemption}</cac:TaxCategory>")
    }

    fn evaluate(document: &Document) -> Vec<RuleViolation> {
        ZeroRateExemptionRule
            .evaluate(document, &RuleContext::default())
            .unwrap()
    }

    #[test]
    fn test_zero_rate_without_exemption() {
        let doc = invoice(&line(Some("7"), &category("0", None)));
        let violations = evaluate(&doc);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].id, "VAT-002");
        assert_eq!(violations[0].severity, Severity::Error);
        assert!(violations[0].message.contains("Line 7"));
        assert_eq!(violations[0].position(), Position::new(BODY_FIRST_LINE, 2));
    }

    #[test]
    fn test_zero_rate_with_exemption() {
        let doc = invoice(&line(Some("1"), &category("0.00", Some("301"))));
        assert!(evaluate(&doc).is_empty());
    }

    #[test]
    fn test_nonzero_missing_or_unparsable_rate() {
        let body = [
            line(Some("1"), &category("18", None)),
            line(Some("2"), ""),
            line(Some("3"), &category("", None)),
            line(Some("4"), &category("zero", None)),
        ]
        .concat();
        assert!(evaluate(&invoice(&body)).is_empty());
    }

    #[test]
    fn test_missing_line_id_falls_back() {
        let doc = invoice(&line(None, &category("0", None)));
        let violations = evaluate(&doc);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Line ?"));
    }

    #[test]
    fn test_only_first_percent_is_checked() {
        let tax = format!("{}{}", category("18", None), category("0", None));
        assert!(evaluate(&invoice(&line(Some("1"), &tax))).is_empty());
    }

    #[test]
    fn test_exemption_under_any_category_counts() {
        let tax = format!("{}{}", category("0", None), category("18", Some("351")));
        assert!(evaluate(&invoice(&line(Some("1"), &tax))).is_empty());
    }

    #[test]
    fn test_one_violation_per_line_in_document_order() {
        let body = [
            line(Some("1"), &category("0", None)),
            line(Some("2"), &category("18", None)),
            line(Some("3"), &category("-0.0", None)),
        ]
        .concat();
        let violations = evaluate(&invoice(&body));

        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("Line 1"));
        assert!(violations[1].message.contains("Line 3"));
        assert!(violations[0].line < violations[1].line);
    }
}
