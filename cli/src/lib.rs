//! stockbalancer-cli: file-backed front end for the stockbalancer engine.
//!
//! Holdings come from a share transaction ledger, prices from a local quote
//! table, and targets from an allocation table. Both tables can
//! live in a plain directory or in a git checkout that is committed on every
//! write. Commands value the
//! portfolio, ask the engine where the next investment should go, and keep
//! a JSONL audit trail of every run.

pub mod allocations;
pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod prices;
pub mod report;
pub mod store;
