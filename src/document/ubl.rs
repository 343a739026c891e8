//! UBL 2.1 namespace URIs used by the invoice rules

/// Invoice document namespace
pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";

/// Common aggregate components (`cac:`)
pub const CAC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";

/// Common basic components (`cbc:`)
pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
