//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use stockbalancer::BalanceConfig;

use crate::error::{Error, Result};
use crate::store::{FileStore, GitRemote, GitStore, TextStore};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub balance: BalanceConfig,
    pub logging: LoggingConfig,
}

/// Where the allocation table, ledger, and price table live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: String,
    pub allocations_file: String,
    pub transactions_file: String,
    pub prices_file: String,
    /// How far back a quote may be used when the requested day has none.
    pub max_price_age_days: u32,
    /// Backend for the allocation table and the ledger.
    pub store: StoreKind,
    pub git: GitConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    /// `dir` is a git checkout; writes are committed.
    Git,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub remote: String,
    pub branch: String,
    pub ssh_key: Option<String>,
    pub push: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            branch: "master".into(),
            ssh_key: None,
            push: true,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: "./data".into(),
            allocations_file: "security_allocations.tsv".into(),
            transactions_file: "security_transactions.csv".into(),
            prices_file: "prices.json".into(),
            max_price_age_days: 3,
            store: StoreKind::File,
            git: GitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "./logs".into(),
            audit_file: "audit.jsonl".into(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        let files = [
            ("allocations_file", &self.data.allocations_file),
            ("transactions_file", &self.data.transactions_file),
            ("prices_file", &self.data.prices_file),
            ("audit_file", &self.logging.audit_file),
        ];
        for (name, value) in files {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} must not be empty")));
            }
        }
        if self.data.store == StoreKind::Git
            && (self.data.git.remote.trim().is_empty() || self.data.git.branch.trim().is_empty())
        {
            return Err(Error::Config(
                "git store needs a remote and a branch".into(),
            ));
        }
        self.balance.validate().map_err(Error::Config)?;
        Ok(())
    }

    pub fn allocations_path(&self) -> PathBuf {
        Path::new(&self.data.dir).join(&self.data.allocations_file)
    }

    pub fn transactions_path(&self) -> PathBuf {
        Path::new(&self.data.dir).join(&self.data.transactions_file)
    }

    pub fn prices_path(&self) -> PathBuf {
        Path::new(&self.data.dir).join(&self.data.prices_file)
    }

    pub fn allocations_store(&self) -> Result<Box<dyn TextStore>> {
        self.store_for(self.allocations_path())
    }

    pub fn transactions_store(&self) -> Result<Box<dyn TextStore>> {
        self.store_for(self.transactions_path())
    }

    fn store_for(&self, path: PathBuf) -> Result<Box<dyn TextStore>> {
        Ok(match self.data.store {
            StoreKind::File => Box::new(FileStore::new(path)),
            StoreKind::Git => {
                let git = &self.data.git;
                let remote = GitRemote {
                    remote: git.remote.clone(),
                    branch: git.branch.clone(),
                    ssh_key: git.ssh_key.as_ref().map(PathBuf::from),
                    push: git.push,
                };
                Box::new(GitStore::new(path, remote)?)
            }
        })
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
