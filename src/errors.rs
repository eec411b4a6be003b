//! Unified error types for the budgeting ledger.
//!
//! Every failure the core can produce is recoverable by the caller: funds
//! shortfalls and validation failures abort before any state mutation,
//! duplicate hits carry the candidate transactions so the caller can retry
//! with an explicit override, and reconfiguration failures name the side
//! (gross/net) that needs interactive correction.

use crate::entities::transaction;
use thiserror::Error;

/// All error conditions surfaced by the ledger core.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any state mutation (blank name, bad rate, ...).
    #[error("Validation error: {message}")]
    Validation {
        /// Explanation surfaced verbatim to the caller
        message: String,
    },

    /// Amount is zero, negative, or not a finite number.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount in dollars
        amount: f64,
    },

    /// The deposit cannot satisfy the minimum required distribution.
    #[error("Insufficient funds for whole account action (minimum ${minimum:.2})")]
    Funds {
        /// Minimum amount in dollars that would make the action feasible
        minimum: f64,
    },

    /// Structurally invalid deposit (negative fixed amount, no accounts, ...).
    #[error("Invalid deposit: {message}")]
    InvalidDeposit {
        /// Explanation of what made the deposit malformed
        message: String,
    },

    /// One or more active transactions share this date, account, and amount.
    ///
    /// Non-fatal: the caller may re-invoke with `override_duplicate` after
    /// inspecting the candidates.
    #[error("Possible duplicate transaction(s) found ({})", candidates.len())]
    Duplicate {
        /// The matching transactions, for caller inspection
        candidates: Vec<transaction::Model>,
    },

    /// Percentage totals violate the gross <= 100% / net == 100% invariant.
    ///
    /// Whole-account actions refuse to run until the named side is fixed.
    #[error(
        "Account reconfiguration required (gross needs fix: {gross}, net needs fix: {net})"
    )]
    ReconfigurationRequired {
        /// Gross-percentage accounts sum to more than 100%
        gross: bool,
        /// Net-percentage accounts do not sum to exactly 100%
        net: bool,
    },

    /// No account matched the given name or id.
    #[error("Account not found: {name}")]
    AccountNotFound {
        /// Name (or stringified id) that failed to resolve
        name: String,
    },

    /// No user matched the given name or id.
    #[error("User not found: {name}")]
    UserNotFound {
        /// Name (or stringified id) that failed to resolve
        name: String,
    },

    /// No transaction exists with the given id.
    #[error("Transaction not found: {id}")]
    TransactionNotFound {
        /// The id that failed to resolve
        id: i64,
    },

    /// Configuration error (missing file, bad TOML, ...).
    #[error("Configuration error: {message}")]
    Config {
        /// Explanation of the configuration problem
        message: String,
    },

    /// Database error from `SeaORM`.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
