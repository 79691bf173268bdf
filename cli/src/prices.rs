//! Security prices by date.
//!
//! The balancer only needs one number per security and day, so the source is
//! a trait. [`PriceTable`] serves quotes from a local JSON file:
//!
//! ```json
//! { "AAPL": [ { "date": "2024-03-01", "price": 179.66 } ] }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use log::{debug, warn};
use serde::Deserialize;
use stockbalancer::{Money, Portfolio, Security};

use crate::error::{Error, Result};
use crate::ledger::Holdings;

/// Anything that can price a security on a given day.
pub trait PriceSource {
    fn price(&self, security: &Security, date: NaiveDate) -> Result<Money>;
}

/// One dated quote.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Quote {
    pub date: NaiveDate,
    pub price: Money,
}

/// Quotes per security, each list sorted by date.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    quotes: BTreeMap<Security, Vec<Quote>>,
    max_age_days: u32,
}

impl PriceTable {
    /// Build a table. Quotes may arrive in any order.
    pub fn new(quotes: BTreeMap<Security, Vec<Quote>>, max_age_days: u32) -> Result<Self> {
        let mut quotes = quotes;
        for (security, list) in &mut quotes {
            if let Some(bad) = list.iter().find(|q| !q.price.is_finite() || q.price <= 0.0) {
                return Err(Error::Prices(format!(
                    "{security} on {}: price must be positive, got {}",
                    bad.date, bad.price
                )));
            }
            list.sort_by_key(|q| q.date);
            list.dedup_by_key(|q| q.date);
        }
        Ok(Self {
            quotes,
            max_age_days,
        })
    }

    pub fn from_json(contents: &str, max_age_days: u32) -> Result<Self> {
        let quotes: BTreeMap<Security, Vec<Quote>> = serde_json::from_str(contents)?;
        Self::new(quotes, max_age_days)
    }

    pub fn load(path: &Path, max_age_days: u32) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::File {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table = Self::from_json(&contents, max_age_days)?;
        debug!(
            "Loaded quotes for {} securities from {}",
            table.quotes.len(),
            path.display()
        );
        Ok(table)
    }

    /// Most recent quote date across all securities.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.quotes
            .values()
            .filter_map(|list| list.last().map(|q| q.date))
            .max()
    }
}

impl PriceSource for PriceTable {
    /// Latest quote on or before `date`, at most `max_age_days` old.
    fn price(&self, security: &Security, date: NaiveDate) -> Result<Money> {
        let list = self
            .quotes
            .get(security)
            .ok_or_else(|| Error::Prices(format!("no quotes for {security}")))?;

        let idx = list.partition_point(|q| q.date <= date);
        let earliest = date
            .checked_sub_days(Days::new(u64::from(self.max_age_days)))
            .unwrap_or(NaiveDate::MIN);

        match idx.checked_sub(1).map(|i| list[i]) {
            Some(quote) if quote.date >= earliest => {
                if quote.date < date {
                    warn!("{security}: no quote for {date}, using {}", quote.date);
                }
                Ok(quote.price)
            }
            _ => Err(Error::Prices(format!(
                "no quote for {security} between {earliest} and {date}"
            ))),
        }
    }
}

/// Value each holding at `date`: shares times price.
pub fn value_holdings(
    holdings: &Holdings,
    source: &dyn PriceSource,
    date: NaiveDate,
) -> Result<Portfolio> {
    holdings
        .iter()
        .map(|(security, shares)| {
            let price = source.price(security, date)?;
            Ok((security.clone(), *shares as f64 * price))
        })
        .collect()
}
