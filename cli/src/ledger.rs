//! Share transaction ledger.
//!
//! The ledger is the source of truth for holdings. Each line records a signed
//! share amount (negative for a sale) and the day it happened:
//!
//! ```text
//! security_id;transaction_share_amount;transaction_date
//! AAPL;10;2020-01-01
//! AAPL;-5;2020-01-04
//! ```

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use rustc_hash::FxHashMap;
use stockbalancer::{Money, Security, total_value};

use crate::error::{Error, Result};
use crate::prices::{PriceSource, value_holdings};
use crate::store::TextStore;

pub const HEADER: &str = "security_id;transaction_share_amount;transaction_date";

/// Share counts per security.
pub type Holdings = BTreeMap<Security, i64>;

/// One purchase or sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareTransaction {
    pub security: Security,
    pub shares: i64,
    pub date: NaiveDate,
}

impl ShareTransaction {
    pub fn new(security: impl Into<Security>, shares: i64, date: NaiveDate) -> Self {
        Self {
            security: security.into(),
            shares,
            date,
        }
    }

    fn to_line(&self) -> String {
        format!("{};{};{}", self.security, self.shares, self.date.format("%Y-%m-%d"))
    }
}

/// All recorded transactions, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    transactions: Vec<ShareTransaction>,
}

impl Ledger {
    pub fn new(transactions: Vec<ShareTransaction>) -> Self {
        Self { transactions }
    }

    pub fn transactions(&self) -> &[ShareTransaction] {
        &self.transactions
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Parse ledger text. The header line is optional.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut transactions = Vec::new();
        let mut first_row = true;

        for (i, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if std::mem::take(&mut first_row) && line.starts_with("security_id") {
                continue;
            }
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            let [id, shares, date] = fields.as_slice() else {
                return Err(Error::Ledger(format!(
                    "line {}: expected 3 fields separated by ';', got {}",
                    i + 1,
                    fields.len()
                )));
            };
            if id.is_empty() {
                return Err(Error::Ledger(format!("line {}: empty security id", i + 1)));
            }
            let shares: i64 = shares.parse().map_err(|_| {
                Error::Ledger(format!("line {}: invalid share amount '{shares}'", i + 1))
            })?;
            let date = parse_date(date)
                .ok_or_else(|| Error::Ledger(format!("line {}: invalid date '{date}'", i + 1)))?;
            transactions.push(ShareTransaction::new(*id, shares, date));
        }

        Ok(Self { transactions })
    }

    /// Load the ledger. Nothing stored yet is an empty ledger.
    pub fn load(store: &dyn TextStore) -> Result<Self> {
        match store.read()? {
            Some(contents) => Self::parse(&contents),
            None => {
                debug!("No ledger at {}, starting empty", store.location());
                Ok(Self::default())
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for t in &self.transactions {
            out.push_str(&t.to_line());
            out.push('\n');
        }
        out
    }

    /// Rewrite the whole ledger.
    pub fn save(&self, store: &dyn TextStore) -> Result<()> {
        store.write(&self.render())
    }

    /// Add `new` after the stored transactions and save.
    ///
    /// The stored ledger is re-read first so entries written elsewhere since
    /// `self` was loaded are kept.
    pub fn append(&mut self, store: &dyn TextStore, new: &[ShareTransaction]) -> Result<()> {
        let mut current = Self::load(store)?;
        current.transactions.extend_from_slice(new);
        current.save(store)?;
        *self = current;
        Ok(())
    }

    /// Current share counts. Fully sold positions are dropped.
    pub fn holdings(&self) -> Holdings {
        aggregate(self.transactions.iter())
    }

    /// Share counts after every transaction dated on or before `date`.
    pub fn holdings_at(&self, date: NaiveDate) -> Holdings {
        aggregate(self.transactions.iter().filter(|t| t.date <= date))
    }

    /// Distinct transaction dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.transactions.iter().map(|t| t.date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Portfolio value at each transaction date, priced on that date.
    pub fn history(&self, source: &dyn PriceSource) -> Result<BTreeMap<NaiveDate, Money>> {
        self.dates()
            .into_iter()
            .map(|date| {
                let values = value_holdings(&self.holdings_at(date), source, date)?;
                Ok((date, total_value(&values)))
            })
            .collect()
    }
}

fn aggregate<'a>(transactions: impl Iterator<Item = &'a ShareTransaction>) -> Holdings {
    let mut totals: FxHashMap<&Security, i64> = FxHashMap::default();
    for t in transactions {
        *totals.entry(&t.security).or_insert(0) += t.shares;
    }
    totals
        .into_iter()
        .filter(|(_, shares)| *shares != 0)
        .map(|(security, shares)| (security.clone(), shares))
        .collect()
}

/// ISO day, optionally followed by a time of day.
fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::{PriceTable, Quote};
    use crate::store::FileStore;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    fn sample() -> Ledger {
        Ledger::new(vec![
            ShareTransaction::new("AAPL", 10, day(1, 1)),
            ShareTransaction::new("TSLA", 10, day(1, 1)),
            ShareTransaction::new("AMZN", 10, day(1, 1)),
            ShareTransaction::new("AAPL", -5, day(1, 4)),
            ShareTransaction::new("TSLA", 5, day(1, 5)),
        ])
    }

    #[test]
    fn holdings_aggregate_per_security() {
        let holdings = sample().holdings();
        assert_eq!(holdings[&Security::new("AAPL")], 5);
        assert_eq!(holdings[&Security::new("TSLA")], 15);
        assert_eq!(holdings[&Security::new("AMZN")], 10);
    }

    #[test]
    fn closed_positions_dropped() {
        let mut ledger = sample();
        ledger
            .transactions
            .push(ShareTransaction::new("AMZN", -10, day(1, 6)));
        assert!(!ledger.holdings().contains_key(&Security::new("AMZN")));
    }

    #[test]
    fn holdings_as_of_date() {
        let holdings = sample().holdings_at(day(1, 4));
        assert_eq!(holdings[&Security::new("AAPL")], 5);
        assert_eq!(holdings[&Security::new("TSLA")], 10);
    }

    #[test]
    fn parse_accepts_datetime_column() {
        let text = "security_id;transaction_share_amount;transaction_date\n\
                    AAPL;10;2020-01-01 00:00:00\n\
                    AAPL;-5;2020-01-04\n";
        let ledger = Ledger::parse(text).unwrap();
        assert_eq!(ledger.transactions().len(), 2);
        assert_eq!(ledger.transactions()[0].date, day(1, 1));
    }

    #[test]
    fn parse_reports_line_number() {
        let err = Ledger::parse("AAPL;10;2020-01-01\nTSLA;ten;2020-01-02\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn parse_rejects_missing_field() {
        assert!(matches!(Ledger::parse("AAPL;10\n"), Err(Error::Ledger(_))));
    }

    #[test]
    fn render_then_parse_is_stable() {
        let ledger = sample();
        assert_eq!(Ledger::parse(&ledger.render()).unwrap(), ledger);
    }

    #[test]
    fn append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let store = FileStore::new(&path);
        let mut ledger = Ledger::load(&store).unwrap();
        assert!(ledger.is_empty());

        ledger
            .append(&store, &[ShareTransaction::new("SPY", 5, day(2, 1))])
            .unwrap();
        ledger
            .append(&store, &[ShareTransaction::new("GE", 5, day(2, 2))])
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("security_id").count(), 1);
        assert_eq!(Ledger::load(&store).unwrap(), ledger);
    }

    #[test]
    fn append_keeps_entries_stored_since_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("ledger.csv"));
        let mut stale = Ledger::load(&store).unwrap();
        sample().save(&store).unwrap();

        stale
            .append(&store, &[ShareTransaction::new("GE", 5, day(2, 2))])
            .unwrap();
        assert_eq!(stale.transactions().len(), 6);
        assert_eq!(stale.holdings()[&Security::new("AAPL")], 5);
    }

    #[test]
    fn history_uses_holdings_as_of_each_date() {
        let quote = |d, price| Quote { date: day(1, d), price };
        let mut quotes = BTreeMap::new();
        quotes.insert(Security::new("AAPL"), vec![quote(1, 10.0), quote(4, 12.0), quote(5, 12.0)]);
        quotes.insert(Security::new("TSLA"), vec![quote(1, 20.0), quote(4, 20.0), quote(5, 30.0)]);
        quotes.insert(Security::new("AMZN"), vec![quote(1, 1.0), quote(4, 1.0), quote(5, 2.0)]);
        let table = PriceTable::new(quotes, 0).unwrap();

        let history = sample().history(&table).unwrap();
        assert_eq!(history.len(), 3);
        // 10*10 + 10*20 + 10*1
        assert_eq!(history[&day(1, 1)], 310.0);
        // 5*12 + 10*20 + 10*1
        assert_eq!(history[&day(1, 4)], 270.0);
        // 5*12 + 15*30 + 10*2
        assert_eq!(history[&day(1, 5)], 530.0);
    }
}
