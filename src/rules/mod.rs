//! Business rule engine for UBL invoices
//!
//! Architectural Principle: Service Layer - The engine runs independent rule checkers over one document
//! - Each rule implements the BusinessRule trait for clean polymorphism
//! - Rules never see each other; the engine only concatenates their output
//! - Output order is registration order, then each rule's own document order

pub mod amount;
pub mod currency_scale;
pub mod monetary_total;
pub mod zero_rate_exemption;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::document::Document;
use crate::domain::{InspectorError, InspectorResult, RuleViolation};
use rayon::prelude::*;

pub use currency_scale::CurrencyScaleRule;
pub use monetary_total::MonetaryTotalRule;
pub use zero_rate_exemption::ZeroRateExemptionRule;

/// Default number of fractional digits when no currency-specific scale applies
pub const DEFAULT_SCALE: u32 = 2;

/// Read-only settings shared by every rule during one evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    /// Fractional digits expected when no currency-specific scale applies
    pub scale: u32,
}

impl RuleContext {
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }
}

impl Default for RuleContext {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}

/// Contract for a business rule checker.
///
/// A rule that does not apply to a document returns an empty list. Errors are reserved for
/// content the rule must read but cannot parse; they abort the whole evaluation run.
pub trait BusinessRule: Send + Sync {
    /// Stable short code, e.g. `SUM-001`
    fn id(&self) -> &'static str;

    /// Human-readable description of what the rule enforces
    fn title(&self) -> &'static str;

    /// Evaluate the rule against a document
    fn evaluate(
        &self,
        document: &Document,
        context: &RuleContext,
    ) -> InspectorResult<Vec<RuleViolation>>;
}

/// Identifiers of all built-in rules, in their default registration order
pub const BUILTIN_RULE_IDS: &[&str] = &[
    MonetaryTotalRule::ID,
    ZeroRateExemptionRule::ID,
    CurrencyScaleRule::ID,
];

/// Look up a built-in rule by identifier
pub fn builtin_rule(id: &str) -> Option<Box<dyn BusinessRule>> {
    match id {
        MonetaryTotalRule::ID => Some(Box::new(MonetaryTotalRule)),
        ZeroRateExemptionRule::ID => Some(Box::new(ZeroRateExemptionRule)),
        CurrencyScaleRule::ID => Some(Box::new(CurrencyScaleRule)),
        _ => None,
    }
}

/// Ordered registry of rules
#[derive(Default)]
pub struct RuleEngine {
    rules: Vec<Box<dyn BusinessRule>>,
    parallel: bool,
}

impl RuleEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with every built-in rule registered
    pub fn with_builtin_rules() -> Self {
        Self::new()
            .register(MonetaryTotalRule)
            .register(ZeroRateExemptionRule)
            .register(CurrencyScaleRule)
    }

    /// Create an engine from built-in rule identifiers, in the given order
    pub fn from_rule_ids<S: AsRef<str>>(ids: &[S]) -> InspectorResult<Self> {
        let mut engine = Self::new();
        for id in ids {
            let id = id.as_ref();
            let rule = builtin_rule(id).ok_or_else(|| {
                InspectorError::config(format!(
                    "Unknown rule '{}'. Known rules: {}",
                    id,
                    BUILTIN_RULE_IDS.join(", ")
                ))
            })?;
            engine = engine.register_boxed(rule);
        }
        Ok(engine)
    }

    /// Register a rule after all previously registered ones
    pub fn register<R: BusinessRule + 'static>(self, rule: R) -> Self {
        self.register_boxed(Box::new(rule))
    }

    pub fn register_boxed(mut self, rule: Box<dyn BusinessRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Run rules on the rayon pool instead of one after another
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Registered rules in registration order
    pub fn rules(&self) -> impl Iterator<Item = &dyn BusinessRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Find a registered rule by identifier
    pub fn rule(&self, id: &str) -> Option<&dyn BusinessRule> {
        self.rules().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every registered rule and concatenate the results in registration order.
    ///
    /// The first failing rule (in registration order) fails the whole run; no partial
    /// results are returned.
    pub fn evaluate_all(
        &self,
        document: &Document,
        context: &RuleContext,
    ) -> InspectorResult<Vec<RuleViolation>> {
        let batches: Vec<InspectorResult<Vec<RuleViolation>>> = if self.parallel {
            self.rules
                .par_iter()
                .map(|rule| rule.evaluate(document, context))
                .collect()
        } else {
            self.rules
                .iter()
                .map(|rule| rule.evaluate(document, context))
                .collect()
        };

        let mut violations = Vec::new();
        for batch in batches {
            violations.extend(batch?);
        }
        Ok(violations)
    }
}
