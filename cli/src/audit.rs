//! JSONL audit trail logging.
//!
//! Each run appends events to an audit.jsonl file, one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockbalancer::{AllocationTarget, Portfolio, Recommendation};

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

pub fn log_run_started(audit: &mut AuditLog, command: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "command": command,
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

pub fn log_portfolio_valued(audit: &mut AuditLog, portfolio: &Portfolio) -> Result<()> {
    audit.log(
        "portfolio_valued",
        serde_json::json!({
            "values": portfolio,
            "total": stockbalancer::total_value(portfolio),
        }),
    )
}

pub fn log_plan_computed(
    audit: &mut AuditLog,
    investment: f64,
    recommendation: &Recommendation,
) -> Result<()> {
    audit.log(
        "plan_computed",
        serde_json::json!({
            "investment": investment,
            "mode": recommendation.mode.to_string(),
            "plan": recommendation.plan,
            "deviation": recommendation.deviation,
            "target_sum": recommendation.target_sum,
        }),
    )
}

pub fn log_allocations_updated(audit: &mut AuditLog, target: &AllocationTarget) -> Result<()> {
    audit.log(
        "allocations_updated",
        serde_json::json!({
            "allocations": target,
            "sum": target.sum(),
        }),
    )
}
