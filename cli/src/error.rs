//! Error types for the command-line balancer.

use std::path::PathBuf;

/// All errors that can occur while running a command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("allocations error: {0}")]
    Allocations(String),

    #[error("transaction ledger error: {0}")]
    Ledger(String),

    #[error("price error: {0}")]
    Prices(String),

    #[error("failed to parse price table: {0}")]
    PricesParse(#[from] serde_json::Error),

    #[error("failed to access {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("storage error: {0}")]
    Store(String),

    #[error("balancing failed: {0}")]
    Balance(#[from] stockbalancer::Error),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
