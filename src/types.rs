//! Error types shared across the ledger engine.
//!
//! Business outcomes (insufficient credits) are NOT errors: the spend
//! operations return `Ok(false)` so callers can tell "go work out" apart
//! from "retry later". Only missing entities, bad input, and durable-store
//! failures surface here. Cache failures never do; they are absorbed and
//! logged at the service boundary.

use thiserror::Error;

/// Errors surfaced by ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Referenced user or workout does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Durable store round trip failed; the caller should retry/backoff
    #[error("Store error: {0}")]
    Store(String),

    /// Caller-supplied value outside the permitted range
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
