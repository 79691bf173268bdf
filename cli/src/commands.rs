//! Command implementations: load files → balance → report → record.
//!
//! Each command prints its own report and returns what it computed so the
//! workflow can be driven from tests without a terminal.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use log::{info, warn};
use stockbalancer::{
    AllocationTarget, Balancer, Mode, Money, Portfolio, Recommendation, Search, Security,
};

use crate::allocations;
use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ledger::{Ledger, ShareTransaction};
use crate::prices::{PriceSource, PriceTable, value_holdings};
use crate::report;
use crate::store::TextStore;

/// Options for the `invest` command.
#[derive(Debug, Clone, Default)]
pub struct InvestOptions {
    pub amount: Money,
    /// Fund at most this many securities.
    pub max_count: Option<usize>,
    /// Use the top-n heuristic instead of the exhaustive search.
    pub approximate: bool,
    /// Pricing day; the newest quoted day when unset.
    pub date: Option<NaiveDate>,
    /// Append the plan to the ledger as whole-share transactions.
    pub record: bool,
    /// Compute and print only.
    pub dry_run: bool,
    /// Skip confirmation prompts.
    pub force: bool,
}

/// What `invest` computed and, if asked, recorded.
#[derive(Debug, Clone)]
pub struct InvestOutcome {
    pub portfolio: Portfolio,
    pub recommendation: Recommendation,
    pub recorded: Vec<ShareTransaction>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn confirm(prompt: &str, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
    if confirmed {
        Ok(())
    } else {
        Err(Error::Aborted("Aborted. Nothing was written.".into()))
    }
}

fn load_prices(config: &Config) -> Result<PriceTable> {
    PriceTable::load(&config.prices_path(), config.data.max_price_age_days)
}

/// Compute the next purchases for `opts.amount`.
pub fn invest(config: &Config, opts: &InvestOptions) -> Result<InvestOutcome> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, "invest")?;

    let allocations_store = config.allocations_store()?;
    let target = allocations::load(allocations_store.as_ref())?;
    if target.is_empty() {
        return Err(Error::Allocations(format!(
            "no allocations in {}; add some with `allocations set`",
            allocations_store.location()
        )));
    }

    let ledger_store = config.transactions_store()?;
    let mut ledger = Ledger::load(ledger_store.as_ref())?;
    let prices = load_prices(config)?;
    let date = pricing_date(opts.date, &prices);

    let portfolio = value_holdings(&ledger.holdings(), &prices, date)?;
    audit::log_portfolio_valued(&mut audit, &portfolio)?;

    let mut balance = config.balance.clone();
    if opts.approximate {
        balance.search = Search::TopN;
    }
    let balancer = Balancer::new(balance)?;
    let mode = opts.max_count.map_or(Mode::Unrestricted, Mode::Restricted);

    let recommendation = balancer.recommend(&portfolio, &target, opts.amount, mode)?;
    audit::log_plan_computed(&mut audit, opts.amount, &recommendation)?;
    info!(
        "Planned {} purchases for {:.2} ({mode})",
        recommendation.plan.len(),
        opts.amount
    );

    print!("{}", report::recommendation(&recommendation));
    if (recommendation.target_sum - 1.0).abs() > config.balance.target_sum_tolerance {
        println!(
            "Note: allocations sum to {:.4}; run `allocations normalize` to fix.",
            recommendation.target_sum
        );
    }

    let mut recorded = Vec::new();
    if opts.record {
        let transactions = to_transactions(&recommendation, &prices, date)?;
        if opts.dry_run {
            println!("\n[DRY RUN] {} transactions not recorded.", transactions.len());
        } else if transactions.is_empty() {
            println!("\nNo whole-share transactions to record.");
        } else {
            for t in &transactions {
                println!("  {:+} {} on {}", t.shares, t.security, t.date);
            }
            confirm("Record these transactions?", opts.force)?;
            ledger.append(ledger_store.as_ref(), &transactions)?;
            audit.log(
                "transactions_recorded",
                serde_json::json!({ "count": transactions.len() }),
            )?;
            recorded = transactions;
        }
    }
    audit.log_simple("run_completed")?;

    Ok(InvestOutcome {
        portfolio,
        recommendation,
        recorded,
    })
}

/// Whole shares for each planned amount, rounded toward zero.
pub fn to_transactions(
    recommendation: &Recommendation,
    prices: &dyn PriceSource,
    date: NaiveDate,
) -> Result<Vec<ShareTransaction>> {
    let mut out = Vec::new();
    for (security, amount) in &recommendation.plan {
        let price = prices.price(security, date)?;
        let shares = (amount / price).trunc() as i64;
        if shares == 0 {
            if *amount != 0.0 {
                warn!("{security}: {amount:.2} buys less than one share at {price:.2}");
            }
            continue;
        }
        out.push(ShareTransaction::new(security.clone(), shares, date));
    }
    Ok(out)
}

/// Requested day, else the newest day in the price table, else today.
pub fn pricing_date(requested: Option<NaiveDate>, prices: &PriceTable) -> NaiveDate {
    requested
        .or_else(|| prices.latest_date())
        .unwrap_or_else(today)
}

/// Current holdings valued at `date`.
pub fn show_portfolio(config: &Config, date: Option<NaiveDate>) -> Result<Portfolio> {
    let ledger = Ledger::load(config.transactions_store()?.as_ref())?;
    let prices = load_prices(config)?;
    let portfolio = value_holdings(&ledger.holdings(), &prices, pricing_date(date, &prices))?;
    print!("{}", report::portfolio(&portfolio));
    Ok(portfolio)
}

/// Portfolio value at each transaction date.
pub fn show_history(config: &Config) -> Result<BTreeMap<NaiveDate, Money>> {
    let ledger = Ledger::load(config.transactions_store()?.as_ref())?;
    let prices = load_prices(config)?;
    let history = ledger.history(&prices)?;
    print!("{}", report::history(&history));
    Ok(history)
}

pub fn show_allocations(config: &Config) -> Result<AllocationTarget> {
    let target = allocations::load(config.allocations_store()?.as_ref())?;
    print!("{}", report::allocations(&target));
    Ok(target)
}

/// Pin one security's fraction and rescale the rest to keep the sum at 1.
pub fn set_allocation(
    config: &Config,
    security: &Security,
    fraction: f64,
    force: bool,
) -> Result<AllocationTarget> {
    let store = config.allocations_store()?;
    let current = allocations::load(store.as_ref())?;
    if !current.contains(security) {
        info!("Adding {security} to the allocations");
    }
    let updated = current.with_allocation(security.clone(), fraction)?;
    write_allocations(config, store.as_ref(), &updated, force)?;
    Ok(updated)
}

/// Rescale the stored allocations to sum to 1.
pub fn normalize_allocations(config: &Config, force: bool) -> Result<AllocationTarget> {
    let store = config.allocations_store()?;
    let current = allocations::load(store.as_ref())?;
    let normalized = current.normalized()?;
    write_allocations(config, store.as_ref(), &normalized, force)?;
    Ok(normalized)
}

fn write_allocations(
    config: &Config,
    store: &dyn TextStore,
    target: &AllocationTarget,
    force: bool,
) -> Result<()> {
    print!("{}", report::allocations(target));
    confirm("Save these allocations?", force)?;

    allocations::save(store, target)?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_allocations_updated(&mut audit, target)?;
    info!("Saved {} allocations", target.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::Quote;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn table(prices: &[(&str, f64)]) -> PriceTable {
        let quotes = prices
            .iter()
            .map(|(s, p)| {
                (
                    Security::new(*s),
                    vec![Quote {
                        date: day(),
                        price: *p,
                    }],
                )
            })
            .collect();
        PriceTable::new(quotes, 3).unwrap()
    }

    fn rec(plan: &[(&str, f64)]) -> Recommendation {
        Recommendation {
            plan: plan.iter().map(|(s, x)| (Security::new(*s), *x)).collect(),
            deviation: 0.0,
            target_sum: 1.0,
            mode: Mode::Unrestricted,
        }
    }

    #[test]
    fn whole_shares_round_toward_zero() {
        let prices = table(&[("AAPL", 100.0), ("TSLA", 40.0)]);
        let txs = to_transactions(&rec(&[("AAPL", 250.0), ("TSLA", -90.0)]), &prices, day()).unwrap();
        assert_eq!(txs[0], ShareTransaction::new("AAPL", 2, day()));
        assert_eq!(txs[1], ShareTransaction::new("TSLA", -2, day()));
    }

    #[test]
    fn sub_share_amounts_skipped() {
        let prices = table(&[("AAPL", 100.0)]);
        let txs = to_transactions(&rec(&[("AAPL", 99.0)]), &prices, day()).unwrap();
        assert!(txs.is_empty());
    }

    #[test]
    fn missing_price_is_an_error() {
        let prices = table(&[("AAPL", 100.0)]);
        assert!(to_transactions(&rec(&[("GOOG", 500.0)]), &prices, day()).is_err());
    }

    #[test]
    fn pricing_date_prefers_request_then_latest_quote() {
        let prices = table(&[("AAPL", 100.0)]);
        let requested = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(pricing_date(Some(requested), &prices), requested);
        assert_eq!(pricing_date(None, &prices), day());
        assert_eq!(pricing_date(None, &PriceTable::default()), today());
    }

    #[test]
    fn forced_confirm_passes() {
        assert!(confirm("unused", true).is_ok());
    }
}
