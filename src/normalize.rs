//! Cleanup of locale-formatted amounts and dates scraped from bank portals.
//!
//! Neither function fails. Malformed amounts become `0` and unrecognized
//! dates are passed through untouched; both are logged at debug level so
//! data-quality problems stay visible without aborting a run.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

/// Date layouts seen on bank portals, tried in order.
const DATE_FORMATS: &[&str] = &["%d %b %Y", "%d %B %Y", "%d/%m/%Y", "%d-%m-%Y"];

const ISO_DATE: &str = "%Y-%m-%d";

/// Parse an amount like `"₹4,90,793.29"` or `"1,37,905.18 Cr."` into whole
/// currency units, truncating any fraction.
pub fn parse_amount(text: &str) -> u64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let cleaned = cleaned.trim_end_matches('.');

    if cleaned.is_empty() {
        if !text.trim().is_empty() {
            debug!(text, "Amount has no digits, using 0");
        }
        return 0;
    }

    let parsed = if cleaned.starts_with('.') {
        Decimal::from_str(&format!("0{cleaned}"))
    } else {
        Decimal::from_str(cleaned)
    };

    match parsed.ok().and_then(|value| value.trunc().to_u64()) {
        Some(amount) => amount,
        None => {
            debug!(text, "Amount is not a number, using 0");
            0
        }
    }
}

/// Parse a portal date (`"11 Jun 2026"`, `"18/03/2026"`, `"18-03-2026"`)
/// into ISO `YYYY-MM-DD`. Unrecognized input is returned unchanged.
pub fn parse_date(text: &str) -> String {
    let trimmed = text.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.format(ISO_DATE).to_string();
        }
    }

    if !trimmed.is_empty() && !is_iso_date(trimmed) {
        debug!(text, "Date did not match any known format");
    }
    text.to_string()
}

/// True when `text` is already a canonical ISO date.
pub fn is_iso_date(text: &str) -> bool {
    text.len() == 10 && NaiveDate::parse_from_str(text, ISO_DATE).is_ok()
}

/// Normalize a maturity date reported by an adapter. ISO dates and the
/// empty "unresolved" marker are kept as they are.
pub fn normalize_maturity_date(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_iso_date(trimmed) {
        return trimmed.to_string();
    }
    parse_date(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_rupee_formats() {
        assert_eq!(parse_amount("₹4,90,793.29"), 490793);
        assert_eq!(parse_amount("1,37,905.18 Cr."), 137905);
        assert_eq!(parse_amount("₹ 1,00,000"), 100000);
        assert_eq!(parse_amount("0.99"), 0);
    }

    #[test]
    fn test_parse_amount_without_digits_is_zero() {
        assert_eq!(parse_amount(""), 0);
        assert_eq!(parse_amount("   "), 0);
        assert_eq!(parse_amount("N/A"), 0);
        assert_eq!(parse_amount("Cr."), 0);
        assert_eq!(parse_amount("."), 0);
    }

    #[test]
    fn test_parse_amount_malformed_is_zero() {
        assert_eq!(parse_amount("1.2.3"), 0);
        assert_eq!(parse_amount("99999999999999999999999999999999999"), 0);
    }

    #[test]
    fn test_parse_amount_truncates() {
        assert_eq!(parse_amount("12.999"), 12);
        assert_eq!(parse_amount(".75"), 0);
        assert_eq!(parse_amount("15."), 15);
    }

    #[test]
    fn test_parse_date_known_formats() {
        assert_eq!(parse_date("11 Jun 2026"), "2026-06-11");
        assert_eq!(parse_date("18/03/2026"), "2026-03-18");
        assert_eq!(parse_date("18-03-2026"), "2026-03-18");
        assert_eq!(parse_date("  5 Jan 2027 "), "2027-01-05");
        assert_eq!(parse_date("11 June 2026"), "2026-06-11");
    }

    #[test]
    fn test_parse_date_passthrough() {
        assert_eq!(parse_date("not a date"), "not a date");
        assert_eq!(parse_date(""), "");
        assert_eq!(parse_date("31/02/2026"), "31/02/2026");
    }

    #[test]
    fn test_normalize_maturity_date() {
        assert_eq!(normalize_maturity_date("2026-06-11"), "2026-06-11");
        assert_eq!(normalize_maturity_date(""), "");
        assert_eq!(normalize_maturity_date("11 Jun 2026"), "2026-06-11");
        assert_eq!(normalize_maturity_date("pending"), "pending");
    }

    #[test]
    fn test_is_iso_date() {
        assert!(is_iso_date("2026-03-18"));
        assert!(!is_iso_date("2026-3-18"));
        assert!(!is_iso_date("18/03/2026"));
    }
}
