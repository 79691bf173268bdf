//! Tab-separated allocation table.
//!
//! ```text
//! security_id	allocation_percentage
//! AAPL	0.4
//! TSLA	0.6
//! ```
//!
//! Tables that carry a leading row-index column are accepted on read.

use log::debug;
use stockbalancer::AllocationTarget;

use crate::error::{Error, Result};
use crate::store::TextStore;

pub const HEADER: &str = "security_id\tallocation_percentage";

/// Load the allocation table. Nothing stored yet is an empty target.
pub fn load(store: &dyn TextStore) -> Result<AllocationTarget> {
    match store.read()? {
        Some(contents) => parse(&contents),
        None => {
            debug!("No allocation table at {}, starting empty", store.location());
            Ok(AllocationTarget::default())
        }
    }
}

/// Parse the table text.
pub fn parse(contents: &str) -> Result<AllocationTarget> {
    let mut pairs = Vec::new();
    let mut first_row = true;

    for (i, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if std::mem::take(&mut first_row) && fields.contains(&"security_id") {
            continue;
        }
        let (id, fraction) = match fields.as_slice() {
            [id, fraction] | [_, id, fraction] => (*id, *fraction),
            _ => {
                return Err(Error::Allocations(format!(
                    "line {}: expected `security_id<TAB>allocation_percentage`",
                    i + 1
                )));
            }
        };
        if id.is_empty() {
            return Err(Error::Allocations(format!("line {}: empty security id", i + 1)));
        }
        let fraction: f64 = fraction.parse().map_err(|_| {
            Error::Allocations(format!("line {}: invalid allocation '{fraction}'", i + 1))
        })?;
        pairs.push((id.to_string(), fraction));
    }

    AllocationTarget::new(pairs).map_err(|e| Error::Allocations(e.to_string()))
}

/// Render the table text, header included, in security order.
pub fn render(target: &AllocationTarget) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (security, fraction) in target {
        out.push_str(&format!("{security}\t{fraction}\n"));
    }
    out
}

pub fn save(store: &dyn TextStore, target: &AllocationTarget) -> Result<()> {
    store.write(&render(target))
}
