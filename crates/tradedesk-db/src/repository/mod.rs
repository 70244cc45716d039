//! # Repository Module
//!
//! Database repository implementations for Tradedesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  API handler                                                            │
//! │       │                                                                 │
//! │       │  db.transactions().create_sale(input)                           │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                  │
//! │  ├── validate input            (tradedesk-core)                         │
//! │  ├── pool.begin()                                                       │
//! │  ├── read / check / write      (&mut *tx, never the pool)               │
//! │  └── tx.commit()                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write helpers that must join a caller's transaction take
//! `&mut SqliteConnection` and are `pub(crate)`.
//!
//! ## Available Repositories
//!
//! - [`AgencyRepository`](agency::AgencyRepository) - Agencies
//! - [`WarehouseRepository`](warehouse::WarehouseRepository) - Main and virtual warehouses
//! - [`UserRepository`](user::UserRepository) - Users (sales reps get a virtual warehouse)
//! - [`ProductRepository`](product::ProductRepository) - Catalogue
//! - [`StockRepository`](stock::StockRepository) - Quantities and transfers
//! - [`CustomerRepository`](party::CustomerRepository), [`SupplierRepository`](party::SupplierRepository)
//! - [`TransactionRepository`](transaction::TransactionRepository) - Sales, purchases, returns, payments
//! - [`AccountRepository`](account::AccountRepository) - Income / expense records
//! - [`BankRepository`](bank::BankRepository) - Bank ledger
//! - [`LoanRepository`](loan::LoanRepository) - Loans and installments
//! - [`TreasuryRepository`](treasury::TreasuryRepository) - Cash balance and ledger
//! - [`ReportRepository`](report::ReportRepository) - Summaries
//! - [`JournalRepository`](journal::JournalRepository) - Journal sync and audit

pub mod account;
pub mod agency;
pub mod bank;
pub mod journal;
pub mod loan;
pub mod party;
pub mod product;
pub mod report;
pub mod stock;
pub mod transaction;
pub mod treasury;
pub mod user;
pub mod warehouse;

use chrono::{DateTime, Utc};
use tradedesk_core::TransactionKind;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Generates a new entity id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a document number: `{PREFIX}-{YYYYMMDD}-{6 hex}`.
///
/// ## Example
/// `SAL-20260118-4F2A9C`
pub(crate) fn generate_reference(kind: TransactionKind, at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        kind.reference_prefix(),
        at.format("%Y%m%d"),
        suffix[..6].to_uppercase()
    )
}

/// Turns a missing row into `DbError::NotFound`.
pub(crate) fn require<T>(row: Option<T>, entity: &str, id: &str) -> DbResult<T> {
    row.ok_or_else(|| DbError::not_found(entity, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let at = DateTime::parse_from_rfc3339("2026-01-18T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let reference = generate_reference(TransactionKind::Sale, at);

        assert!(reference.starts_with("SAL-20260118-"));
        assert_eq!(reference.len(), "SAL-20260118-".len() + 6);
        assert_ne!(reference, generate_reference(TransactionKind::Sale, at));
    }

    #[test]
    fn test_require() {
        assert_eq!(require(Some(3), "Bank", "b").unwrap(), 3);
        assert!(matches!(
            require::<i32>(None, "Bank", "b"),
            Err(DbError::NotFound { .. })
        ));
    }
}
