use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::DisplayConfig;

/// How digits of an amount are grouped for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitGrouping {
    /// Lakh/crore style: `12,34,56,789`.
    #[default]
    Indian,
    /// Thousands: `123,456,789`.
    International,
    None,
}

/// Insert separators into a string of ASCII digits.
pub fn group_digits(digits: &str, grouping: DigitGrouping) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 2);
    for (i, ch) in digits.chars().enumerate() {
        out.push(ch);
        let remaining = len - i - 1;
        let separator = match grouping {
            DigitGrouping::None => false,
            DigitGrouping::International => remaining > 0 && remaining % 3 == 0,
            // Last group of three, then groups of two.
            DigitGrouping::Indian => {
                remaining == 3 || (remaining > 3 && (remaining - 3) % 2 == 0)
            }
        };
        if separator {
            out.push(',');
        }
    }
    out
}

/// Format a whole-unit amount, e.g. `₹4,90,793`.
pub fn format_amount(amount: u64, display: &DisplayConfig) -> String {
    format!(
        "{}{}",
        display.currency_symbol,
        group_digits(&amount.to_string(), display.grouping)
    )
}

/// Format a signed difference between two amounts, e.g. `+₹1,200` or `-₹350`.
pub fn format_change(before: u64, after: u64, display: &DisplayConfig) -> String {
    if after >= before {
        format!("+{}", format_amount(after - before, display))
    } else {
        format!("-{}", format_amount(before - after, display))
    }
}

/// `18-03-2026`
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Render a stored maturity date as `11 Jun 2026`. Unresolved or
/// unparseable dates are shown as stored.
pub fn format_maturity_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%d %b %Y").to_string(),
        Err(_) if date.is_empty() => "unknown".to_string(),
        Err(_) => date.to_string(),
    }
}
