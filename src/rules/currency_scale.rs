//! CUR-001: monetary values must not exceed their currency's decimal scale

use super::amount::{currency_scale, fractional_digits};
use super::{BusinessRule, RuleContext};
use crate::document::Document;
use crate::domain::{InspectorResult, RuleViolation, Severity};
use std::iter;

const CURRENCY_ATTRIBUTE: &str = "currencyID";

/// Every element carrying `currencyID` may have at most as many fractional digits as the
/// currency allows. Unknown currencies fall back to the context scale.
///
/// The check is textual: the value is split on the first `.` and never parsed as a number.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyScaleRule;

impl CurrencyScaleRule {
    pub const ID: &'static str = "CUR-001";
}

impl BusinessRule for CurrencyScaleRule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn title(&self) -> &'static str {
        "Decimal places must match the currency scale"
    }

    fn evaluate(
        &self,
        document: &Document,
        context: &RuleContext,
    ) -> InspectorResult<Vec<RuleViolation>> {
        let root = document.root();
        let mut violations = Vec::new();

        for node in iter::once(root).chain(root.descendants()) {
            let Some(currency) = node.attribute(CURRENCY_ATTRIBUTE) else {
                continue;
            };
            let text = node.value();
            if text.trim().is_empty() {
                continue;
            }

            let scale = currency_scale(currency).unwrap_or(context.scale);
            let digits = fractional_digits(&text);
            if digits as u64 > u64::from(scale) {
                violations.push(
                    RuleViolation::new(
                        Self::ID,
                        Severity::Error,
                        format!(
                            "currencyID={currency} expects {scale} decimal places; value '{text}' has {digits}"
                        ),
                    )
                    .at(node.position),
                );
            }
        }

        Ok(violations)
    }
}
