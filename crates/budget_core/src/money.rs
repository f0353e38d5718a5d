use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::sync::OnceLock;

/// A monetary amount extracted from a bank statement cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAmount {
    pub value: f64,
    pub currency: String,
}

fn paren_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.*\)").unwrap())
}

/// Parses a locale-formatted amount string into value + currency.
///
/// Statements carry amounts like `"740,00 RUR (740,00 RUR)"` or
/// `"8\u{a0}221,71 RUR"` (no-break space as thousands separator, comma as
/// decimal separator). The parenthesized duplicate, when present, is the
/// amount restated in the account currency and is ignored.
pub fn parse_money(raw: &str) -> Result<ParsedAmount> {
    let stripped = paren_suffix_re().replace(raw, "");
    let cleaned = stripped.replace('\u{a0}', "").replace(',', ".");

    let mut parts = cleaned.split_whitespace();
    let number = parts
        .next()
        .ok_or_else(|| anyhow!("empty amount string '{raw}'"))?;
    let currency = parts
        .next()
        .ok_or_else(|| anyhow!("no currency code in amount '{raw}'"))?;

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        bail!("'{currency}' is not a 3-letter currency code in amount '{raw}'");
    }

    let value: f64 = number
        .parse()
        .with_context(|| format!("invalid numeric part '{number}' in amount '{raw}'"))?;

    Ok(ParsedAmount {
        value,
        currency: currency.to_string(),
    })
}

/// Parses a bare comma-decimal number, e.g. `"1234,56"` -> `1234.56`.
pub fn parse_decimal(raw: &str) -> Result<f64> {
    raw.trim()
        .replace('\u{a0}', "")
        .replace(',', ".")
        .parse()
        .with_context(|| format!("invalid decimal '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_with_duplicate_suffix() {
        let parsed = parse_money("740,00 RUR (740,00 RUR)").unwrap();
        assert_eq!(parsed.value, 740.0);
        assert_eq!(parsed.currency, "RUR");
    }

    #[test]
    fn test_parse_money_with_nbsp_thousands_separator() {
        let parsed = parse_money("8\u{a0}221,71 RUR").unwrap();
        assert_eq!(parsed.value, 8221.71);
        assert_eq!(parsed.currency, "RUR");
    }

    #[test]
    fn test_parse_money_plain() {
        let parsed = parse_money("12,50 USD").unwrap();
        assert_eq!(parsed.value, 12.5);
        assert_eq!(parsed.currency, "USD");
    }

    #[test]
    fn test_parse_money_integer_amount() {
        let parsed = parse_money("100 EUR").unwrap();
        assert_eq!(parsed.value, 100.0);
        assert_eq!(parsed.currency, "EUR");
    }

    #[test]
    fn test_parse_money_missing_currency() {
        assert!(parse_money("740,00").is_err());
    }

    #[test]
    fn test_parse_money_bad_currency_token() {
        assert!(parse_money("740,00 RU").is_err());
        assert!(parse_money("740,00 RUBL").is_err());
        assert!(parse_money("740,00 R1R").is_err());
    }

    #[test]
    fn test_parse_money_bad_number() {
        assert!(parse_money("x740 RUR").is_err());
        assert!(parse_money("").is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1234,56").unwrap(), 1234.56);
        assert_eq!(parse_decimal(" 7,00 ").unwrap(), 7.0);
        assert!(parse_decimal("abc").is_err());
    }
}
