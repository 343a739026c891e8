//! Amount grammar and currency scale table shared by the monetary rules

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

lazy_static! {
    /// Invariant decimal grammar: optional sign, digits, optional single decimal point.
    /// No exponent, no thousands separators.
    static ref AMOUNT_GRAMMAR: Regex =
        Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").expect("amount grammar is valid");

    /// Canonical fractional digits per ISO 4217 code
    static ref CURRENCY_SCALES: HashMap<&'static str, u32> = {
        let mut scales = HashMap::new();
        scales.insert("TRY", 2);
        scales.insert("USD", 2);
        scales.insert("EUR", 2);
        scales.insert("JPY", 0);
        scales.insert("KWD", 3);
        scales
    };
}

/// Parse an amount using the invariant grammar.
///
/// Surrounding whitespace is ignored. Returns `None` for anything else the grammar rejects,
/// including values outside the decimal range.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if !AMOUNT_GRAMMAR.is_match(text) {
        return None;
    }

    let (negative, digits) = match text.as_bytes()[0] {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = digits.strip_suffix('.').unwrap_or(digits);

    let mut normalized = String::with_capacity(digits.len() + 2);
    if negative {
        normalized.push('-');
    }
    if digits.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(digits);

    Decimal::from_str(&normalized).ok()
}

/// Canonical scale for a currency code (exact, case-sensitive match)
pub fn currency_scale(code: &str) -> Option<u32> {
    CURRENCY_SCALES.get(code).copied()
}

/// Number of characters after the first decimal point, 0 when there is none
pub fn fractional_digits(text: &str) -> usize {
    text.split_once('.')
        .map(|(_, fraction)| fraction.chars().count())
        .unwrap_or(0)
}
