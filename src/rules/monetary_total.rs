//! SUM-001: invoice line totals must reconcile with the legal monetary total

use super::amount::parse_amount;
use super::{BusinessRule, RuleContext};
use crate::document::ubl::{CAC, CBC};
use crate::document::{Document, XmlNode};
use crate::domain::{InspectorError, InspectorResult, RuleViolation, Severity};
use rust_decimal::{Decimal, RoundingStrategy};

const AMOUNT_FIELD: &str = "LineExtensionAmount";

/// Sum of `InvoiceLine/LineExtensionAmount` rounded to the context scale must equal
/// `LegalMonetaryTotal/LineExtensionAmount`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonetaryTotalRule;

impl MonetaryTotalRule {
    pub const ID: &'static str = "SUM-001";

    fn parse_required(node: &XmlNode, text: &str) -> InspectorResult<Decimal> {
        parse_amount(text).ok_or_else(|| {
            InspectorError::malformed_amount(Self::ID, AMOUNT_FIELD, text, node.position)
        })
    }

    fn sum_lines(root: &XmlNode) -> InspectorResult<Decimal> {
        let mut total = Decimal::ZERO;
        for line in root.descendants_named(CAC, "InvoiceLine") {
            let Some(amount) = line.child(CBC, AMOUNT_FIELD) else {
                continue;
            };
            let text = amount.value();
            if text.trim().is_empty() {
                continue;
            }
            let value = Self::parse_required(amount, &text)?;
            total = total.checked_add(value).ok_or_else(|| {
                InspectorError::amount_overflow(Self::ID, AMOUNT_FIELD, &*text, amount.position)
            })?;
        }
        Ok(total)
    }
}

impl BusinessRule for MonetaryTotalRule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn title(&self) -> &'static str {
        "Invoice line totals must equal LegalMonetaryTotal/LineExtensionAmount"
    }

    fn evaluate(
        &self,
        document: &Document,
        context: &RuleContext,
    ) -> InspectorResult<Vec<RuleViolation>> {
        let root = document.root();

        // First header total wins; later duplicates are ignored.
        let Some(header_node) = root
            .descendants_named(CAC, "LegalMonetaryTotal")
            .flat_map(|total| total.children_named(CBC, AMOUNT_FIELD))
            .next()
        else {
            return Ok(Vec::new());
        };
        let header_text = header_node.value();
        if header_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let header = Self::parse_required(header_node, &header_text)?;
        let computed = Self::sum_lines(root)?
            .round_dp_with_strategy(context.scale, RoundingStrategy::MidpointAwayFromZero);

        if computed == header {
            return Ok(Vec::new());
        }

        Ok(vec![RuleViolation::new(
            Self::ID,
            Severity::Error,
            format!("LineExtensionAmount total {computed} does not match header {header}"),
        )
        .at(root.position)])
    }
}
