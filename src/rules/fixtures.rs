//! Inline invoice fixtures for rule tests

use crate::document::Document;

/// Line number of the first line of `body` inside the wrapped document
pub(crate) const BODY_FIRST_LINE: u32 = 5;

/// Wrap `body` in a UBL Invoice root with the usual prefixes bound
pub(crate) fn invoice(body: &str) -> Document {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Invoice xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2"
         xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
         xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
{body}
</Invoice>
"#
    );
    Document::parse(&xml).expect("fixture is well-formed")
}

/// An invoice with one header total and one line per amount
pub(crate) fn invoice_with_totals(header: &str, lines: &[&str]) -> Document {
    let mut body = format!(
        "<cac:LegalMonetaryTotal>\n<cbc:LineExtensionAmount currencyID=\"TRY\">{header}</cbc:LineExtensionAmount>\n</cac:LegalMonetaryTotal>\n"
    );
    for (i, amount) in lines.iter().enumerate() {
        body.push_str(&format!(
            "<cac:InvoiceLine>\n<cbc:ID>{}</cbc:ID>\n<cbc:LineExtensionAmount currencyID=\"TRY\">{amount}</cbc:LineExtensionAmount>\n</cac:InvoiceLine>\n",
            i + 1
        ));
    }
    invoice(&body)
}
