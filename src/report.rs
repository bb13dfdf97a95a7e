//! Human-readable renderings of daily snapshots.

use crate::config::DisplayConfig;
use crate::format::{format_amount, format_change, format_maturity_date, format_report_date};
use crate::models::DailySnapshot;

const RULE: &str = "-----------------------------";

/// The shareable balance summary: a dated header with the combined total,
/// then one block per account with its balance and FD details.
pub fn render_snapshot(snapshot: &DailySnapshot, display: &DisplayConfig) -> String {
    let totals = snapshot.totals();
    let mut text = String::new();

    text.push_str(RULE);
    text.push('\n');
    text.push_str(&format!(
        "---- Balance : {} ---\n",
        format_report_date(snapshot.date)
    ));
    text.push_str(RULE);
    text.push('\n');
    text.push_str(&format!("*{}*\n\n", format_amount(totals.combined, display)));

    for entry in snapshot.accounts() {
        text.push_str(RULE);
        text.push('\n');
        text.push_str(&format!(
            "*{} - {} - {}*\n",
            entry.holder_name, entry.bank_name, entry.account_number
        ));
        text.push_str(RULE);
        text.push('\n');
        text.push_str(&format!(
            "Balance : {}\n",
            format_amount(entry.balance, display)
        ));
        if !entry.fds.is_empty() {
            text.push_str(&format!(
                "FD : {}\n\n",
                format_amount(entry.fd_total(), display)
            ));
            text.push_str("-------- FD Details --------\n");
            for fd in &entry.fds {
                text.push_str(&format!(
                    "{} : {}\n",
                    format_maturity_date(&fd.maturity_date),
                    format_amount(fd.principal, display)
                ));
            }
        }
        text.push('\n');
    }

    text.trim().to_string()
}

/// Lines describing movement since an earlier snapshot.
pub fn render_change(
    previous: &DailySnapshot,
    current: &DailySnapshot,
    display: &DisplayConfig,
) -> String {
    let before = previous.totals();
    let after = current.totals();
    format!(
        "Change since {}: {} (balance {}, FD {})",
        previous.date,
        format_change(before.combined, after.combined, display),
        format_change(before.balance, after.balance, display),
        format_change(before.fd, after.fd, display),
    )
}

/// FDs whose maturity date is before the snapshot date, one per line.
pub fn render_matured(snapshot: &DailySnapshot, display: &DisplayConfig) -> Vec<String> {
    snapshot
        .matured_fds()
        .into_iter()
        .map(|(entry, fd)| {
            format!(
                "Matured: {} - {} - {}: {} on {}",
                entry.holder_name,
                entry.bank_name,
                entry.account_number,
                format_amount(fd.principal, display),
                format_maturity_date(&fd.maturity_date)
            )
        })
        .collect()
}

/// One line for the `history` listing.
pub fn render_history_line(snapshot: &DailySnapshot, display: &DisplayConfig) -> String {
    let totals = snapshot.totals();
    format!(
        "{}  {:>3} accounts  {} (balance {}, FD {})",
        snapshot.date,
        snapshot.len(),
        format_amount(totals.combined, display),
        format_amount(totals.balance, display),
        format_amount(totals.fd, display),
    )
}
