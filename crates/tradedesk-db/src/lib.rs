//! # tradedesk-db: Database Layer for Tradedesk
//!
//! SQLite storage for the back-office: agencies, stock, trading
//! transactions, accounts, banks and loans, plus the treasury, report and
//! journal views rebuilt from them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tradedesk Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /sales)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   tradedesk-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │    │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │    │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │   │    │
//! │  │   │               │    │ Transaction    │    │              │   │    │
//! │  │   │ SqlitePool    │◄───│ Bank / Loan    │    │ 001_initial  │   │    │
//! │  │   │               │    │ Treasury ...   │    │ _schema.sql  │   │    │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘   │    │
//! │  │                               │                                 │    │
//! │  │                               ▼                                 │    │
//! │  │                 tradedesk-core (formulas, checks)               │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tradedesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tradedesk.db")).await?;
//! let sale = db.transactions().create_sale(&invoice).await?;
//! let treasury = db.treasury().breakdown(&TreasuryScope::General).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::account::{AccountFilter, AccountRepository};
pub use repository::agency::AgencyRepository;
pub use repository::bank::BankRepository;
pub use repository::journal::JournalRepository;
pub use repository::loan::LoanRepository;
pub use repository::party::{CustomerRepository, SupplierRepository};
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::stock::{StockRepository, TransferResult};
pub use repository::transaction::{TransactionFilter, TransactionRepository};
pub use repository::treasury::TreasuryRepository;
pub use repository::user::UserRepository;
pub use repository::warehouse::WarehouseRepository;
