//! Plain-text tables for terminal output.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;
use stockbalancer::{AllocationTarget, Money, Recommendation, Security};

/// Title, rule, then one `SECURITY:  amount` row per entry.
///
/// Names are padded to the longest id so the amounts line up.
pub fn security_table<'a>(
    title: &str,
    rows: impl IntoIterator<Item = (&'a Security, f64)>,
) -> String {
    let rows: Vec<(&Security, f64)> = rows.into_iter().collect();
    let width = rows.iter().map(|(s, _)| s.as_str().len()).max().unwrap_or(0) + 2;

    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(title.len().max(14)));
    for (security, amount) in rows {
        let label = format!("{security}:");
        let _ = writeln!(out, "{label:<width$}{amount:.2}");
    }
    out
}

pub fn recommendation(rec: &Recommendation) -> String {
    let mut out = security_table("Next purchases", rec.plan.iter().map(|(s, x)| (s, *x)));
    let _ = writeln!(out, "\nMode: {}", rec.mode);
    let _ = writeln!(out, "Deviation after purchase: {:.6}", rec.deviation);
    out
}

pub fn portfolio(values: &BTreeMap<Security, Money>) -> String {
    let mut out = security_table("Portfolio", values.iter().map(|(s, x)| (s, *x)));
    let total: Money = values.values().sum();
    let _ = writeln!(out, "\nTotal: {total:.2}");
    out
}

pub fn allocations(target: &AllocationTarget) -> String {
    let mut out = security_table("Allocations", target.iter().map(|(s, f)| (s, *f)));
    let _ = writeln!(out, "\nSum: {:.4}", target.sum());
    out
}

pub fn history(values: &BTreeMap<NaiveDate, Money>) -> String {
    let mut out = String::from("Historical values\n");
    out.push_str(&"-".repeat(17));
    out.push('\n');
    for (date, value) in values {
        let _ = writeln!(out, "{}: {value:.2}", date.format("%d.%m.%Y"));
    }
    out
}
