//! # Error Types
//!
//! Domain-specific error types for tradedesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tradedesk-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tradedesk-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  backoffice-api errors                                                  │
//! │  └── ApiError         - What the dashboard sees (JSON)                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Dashboard    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Raised by pure calculations in this crate and by repository code in
/// tradedesk-db when a check inside a database transaction fails.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough units in a warehouse to sell or transfer.
    ///
    /// ## When This Occurs
    /// - A sale asks for more than the warehouse holds
    /// - A stock transfer drains the source below zero
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A bank withdrawal exceeds the bank balance.
    #[error("Insufficient funds in bank {bank_id}: balance {balance_cents}, requested {requested_cents}")]
    InsufficientFunds {
        bank_id: String,
        balance_cents: i64,
        requested_cents: i64,
    },

    /// Paid/remaining/total do not add up, or a component is negative.
    #[error("Invalid amounts: total {total_cents}, paid {paid_cents}, remaining {remaining_cents}")]
    InvalidAmounts {
        total_cents: i64,
        paid_cents: i64,
        remaining_cents: i64,
    },

    /// The installment has already been settled.
    #[error("Installment {0} is already paid")]
    InstallmentAlreadyPaid(String),

    /// A loan term outside the supported range.
    #[error("Invalid loan term: {months} months (must be 1..={max})")]
    InvalidLoanTerm { months: u32, max: u32 },

    /// A transaction kind used where another was required.
    #[error("Transaction kind {actual} cannot be used for {operation}")]
    WrongTransactionKind { actual: String, operation: String },

    /// A transfer whose source and destination are the same warehouse.
    #[error("Cannot transfer stock from warehouse {0} to itself")]
    SameWarehouse(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
