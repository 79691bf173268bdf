//! Input checks shared by every balancing operation.

use crate::error::{Error, Result};
use crate::types::{Money, Portfolio};

/// Investment must be a finite, non-negative amount.
pub(crate) fn investment(amount: Money) -> Result<()> {
    if !amount.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "investment must be finite, got {amount}"
        )));
    }
    if amount < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "investment must be >= 0, got {amount}"
        )));
    }
    Ok(())
}

/// Holdings must be finite and non-negative (no short positions).
pub(crate) fn portfolio(portfolio: &Portfolio) -> Result<()> {
    for (security, &value) in portfolio {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "holding of {security} must be finite and >= 0, got {value}"
            )));
        }
    }
    Ok(())
}
