//! CLI entry point for the stock balancer.

use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use stockbalancer::Security;
use stockbalancer_cli::commands::{self, InvestOptions};
use stockbalancer_cli::config::Config;
use stockbalancer_cli::error::Error;

#[derive(Parser)]
#[command(name = "stock-balancer")]
#[command(about = "Decide where the next investment goes to keep a portfolio on target")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "stock-balancer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate the next purchases that balance the portfolio
    Invest {
        /// Amount of money to invest
        amount: f64,

        /// Limit the plan to at most N purchases
        #[arg(short = 'n', long)]
        max_count: Option<usize>,

        /// Keep the N largest purchases of the full plan instead of searching
        #[arg(long, requires = "max_count")]
        approximate: bool,

        /// Price holdings as of this day (YYYY-MM-DD) instead of the newest quote
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Append the plan to the ledger as whole-share transactions
        #[arg(long)]
        record: bool,

        /// Show the plan without writing anything to the ledger
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show the current portfolio value
    Portfolio {
        /// Show the value at each transaction date instead
        #[arg(long)]
        history: bool,

        /// Price holdings as of this day (YYYY-MM-DD) instead of the newest quote
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Inspect or edit target allocations
    Allocations {
        #[command(subcommand)]
        action: AllocationsAction,
    },
}

#[derive(Subcommand)]
enum AllocationsAction {
    /// Print the allocation table
    Show,

    /// Pin one security's fraction and rescale the others
    Set {
        security: String,
        fraction: f64,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Rescale all allocations to sum to 1
    Normalize {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Invest {
            amount,
            max_count,
            approximate,
            date,
            record,
            dry_run,
            force,
        } => {
            let opts = InvestOptions {
                amount,
                max_count,
                approximate,
                date,
                record,
                dry_run,
                force,
            };
            commands::invest(&config, &opts).map(drop)
        }
        Command::Portfolio { history: true, .. } => commands::show_history(&config).map(drop),
        Command::Portfolio { date, .. } => commands::show_portfolio(&config, date).map(drop),
        Command::Allocations { action } => match action {
            AllocationsAction::Show => commands::show_allocations(&config).map(drop),
            AllocationsAction::Set {
                security,
                fraction,
                force,
            } => commands::set_allocation(&config, &Security::new(security), fraction, force)
                .map(drop),
            AllocationsAction::Normalize { force } => {
                commands::normalize_allocations(&config, force).map(drop)
            }
        },
    };

    if let Err(e) = result {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            Error::Balance(_) => {
                eprintln!("Error: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
