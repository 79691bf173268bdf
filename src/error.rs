//! Errors reported by the balancing engine.

/// Errors returned by the balancing operations.
///
/// Every error is detected synchronously at the offending call. The engine
/// never retries or recovers; the caller decides what to do.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// An argument is outside its valid range (cardinality, count, negative money).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The inputs leave nothing to compute (empty universe, zero rescaling base).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// The solver produced a non-finite result.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}

pub type Result<T> = std::result::Result<T, Error>;
