//! # tradedesk-core: Pure Business Logic for Tradedesk
//!
//! Types, arithmetic and checks of the multi-agency back-office, with no
//! I/O. The database layer loads rows and hands them to the functions here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tradedesk Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Dashboard (browser, TypeScript)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 backoffice-api (axum handlers)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tradedesk-db (sqlx repositories)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ rows                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ tradedesk-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   types   money   treasury   loan   reports   audit             │   │
//! │  │   input   validation   error                                    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Agency, Transaction, Loan, ...)
//! - [`money`] - Integer-cents `Money`
//! - [`treasury`] - Cash balance formula and running ledger
//! - [`loan`] - Flat-interest installment schedules
//! - [`reports`] - Sales, account, product, debt and loan summaries
//! - [`audit`] - Drift checks behind journal sync and the audit report
//! - [`input`] - Form payloads with their `validate()`
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tradedesk_core::{loan::amortize, InterestRate, Money};
//!
//! let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let schedule = amortize(Money::from_cents(120_000), InterestRate::from_bps(500), 12, start).unwrap();
//!
//! assert_eq!(schedule.total.cents(), 126_000);
//! assert_eq!(schedule.installments.len(), 12);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod input;
pub mod loan;
pub mod money;
pub mod reports;
pub mod treasury;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use treasury::TreasuryScope;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on one sale, purchase or return.
pub const MAX_LINE_ITEMS: usize = 200;

/// Maximum quantity on a single line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Longest loan term accepted (30 years).
pub const MAX_LOAN_TERM_MONTHS: u32 = 360;

/// Largest single amount accepted from input (100 billion major units).
///
/// Sums over stored rows stay far from `i64::MAX` as long as every row
/// respects this ceiling.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000_000;

/// Highest flat loan interest rate accepted (1000%).
pub const MAX_INTEREST_BPS: u32 = 100_000;
