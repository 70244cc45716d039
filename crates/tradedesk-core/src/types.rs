//! # Domain Types
//!
//! Core domain types used throughout Tradedesk.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Master data          Trading                 Money                     │
//! │  ───────────          ───────                 ─────                     │
//! │  Agency               Transaction ──┐         AccountRecord             │
//! │  Warehouse            TransactionItem         Bank ── BankTransaction   │
//! │  User                 (SALE, PURCHASE,        Loan ── Installment       │
//! │  Product ── Stock      RETURN, COLLECTION,    JournalEntry              │
//! │  Customer / Supplier   SUPPLY_PAYMENT)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string, immutable, used for relations
//! - money columns end in `_cents` (i64), see [`Money`]
//! - quantities are whole units (i64)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

/// Implements `as_str`, `Display` and `FromStr` for a string-backed enum.
macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: stringify!($ty).to_string(),
                        allowed: $ty::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Interest Rate
// =============================================================================

/// Flat loan interest rate in basis points.
///
/// 1 basis point = 0.01%, so 1250 bps = 12.5% over the whole loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InterestRate(u32);

impl InterestRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        InterestRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Agency & Warehouse
// =============================================================================

/// A franchise/distributor unit with its own warehouse, products and accounts.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Agency {
    pub id: String,
    pub name: String,
    /// Short business code, unique (e.g. "KBL-01").
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum WarehouseKind {
    /// The agency's physical warehouse.
    Main,
    /// Stock carried by a sales representative. Shares its id with the user.
    Virtual,
}

string_enum!(WarehouseKind { Main => "MAIN", Virtual => "VIRTUAL" });

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Warehouse {
    pub id: String,
    pub agency_id: Option<String>,
    pub name: String,
    pub kind: WarehouseKind,
    /// Set for virtual warehouses; always equal to `id` when present.
    pub owner_user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Warehouse {
    /// A virtual warehouse must be keyed by its owner's user id.
    pub fn is_consistent(&self) -> bool {
        match self.kind {
            WarehouseKind::Main => self.owner_user_id.is_none(),
            WarehouseKind::Virtual => self.owner_user_id.as_deref() == Some(self.id.as_str()),
        }
    }
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum UserRole {
    /// Sees every agency.
    Admin,
    /// Scoped to one agency.
    AgencyManager,
    /// Scoped to one agency and their own virtual warehouse.
    SalesRep,
}

string_enum!(UserRole {
    Admin => "ADMIN",
    AgencyManager => "AGENCY_MANAGER",
    SalesRep => "SALES_REP",
});

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub agency_id: Option<String>,
    pub warehouse_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product & Stock
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Owning agency, `None` for catalogue-wide products.
    pub agency_id: Option<String>,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    pub name: String,
    /// Unit of measure shown on invoices ("box", "kg", ...).
    pub unit: String,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }
}

/// Quantity of one product in one warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Stock {
    pub product_id: String,
    pub warehouse_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customer & Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub agency_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub agency_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// The kind of a trading transaction.
///
/// ## Effects
/// ```text
/// kind            stock        debt                      treasury
/// ─────────────   ──────────   ───────────────────────   ───────────────
/// SALE            - warehouse  customer  + remaining     + paid
/// PURCHASE        + warehouse  supplier  + remaining     - paid
/// RETURN          + warehouse  customer  - remaining     (refund is an EXPENSE record)
/// COLLECTION      -            customer  - paid          + paid
/// SUPPLY_PAYMENT  -            supplier  - paid          (an EXPENSE record)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum TransactionKind {
    Sale,
    Purchase,
    Return,
    Collection,
    SupplyPayment,
}

string_enum!(TransactionKind {
    Sale => "SALE",
    Purchase => "PURCHASE",
    Return => "RETURN",
    Collection => "COLLECTION",
    SupplyPayment => "SUPPLY_PAYMENT",
});

impl TransactionKind {
    /// Whether this kind carries line items and moves stock.
    pub const fn has_items(&self) -> bool {
        matches!(
            self,
            TransactionKind::Sale | TransactionKind::Purchase | TransactionKind::Return
        )
    }

    /// Signed stock effect per unit on the transaction's warehouse.
    pub const fn stock_direction(&self) -> i64 {
        match self {
            TransactionKind::Sale => -1,
            TransactionKind::Purchase | TransactionKind::Return => 1,
            TransactionKind::Collection | TransactionKind::SupplyPayment => 0,
        }
    }

    /// Reference prefix used for generated document numbers.
    pub const fn reference_prefix(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "SAL",
            TransactionKind::Purchase => "PUR",
            TransactionKind::Return => "RET",
            TransactionKind::Collection => "COL",
            TransactionKind::SupplyPayment => "SUP",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub agency_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    /// Human-readable document number, unique (e.g. "SAL-20260118-4F2A9C").
    pub reference: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub remaining_cents: i64,
    pub note: Option<String>,
    /// Business date of the transaction (ordering key of the treasury).
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_cents)
    }

    /// `paid + remaining = total` with no negative component.
    pub fn amounts_balanced(&self) -> bool {
        self.paid_cents >= 0
            && self.remaining_cents >= 0
            && self.paid_cents.checked_add(self.remaining_cents) == Some(self.total_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
}

/// A transaction together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Account Record
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AccountRecordKind {
    Income,
    Expense,
}

string_enum!(AccountRecordKind { Income => "INCOME", Expense => "EXPENSE" });

/// A cash income or expense, optionally tied to an agency, customer or supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AccountRecord {
    pub id: String,
    pub kind: AccountRecordKind,
    pub agency_id: Option<String>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub category: String,
    pub amount_cents: i64,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Category written for the cash side of a SUPPLY_PAYMENT.
pub const CATEGORY_SUPPLIER_PAYMENT: &str = "supplier-payment";

/// Category written for the cash side of a RETURN refund.
pub const CATEGORY_CUSTOMER_REFUND: &str = "customer-refund";

// =============================================================================
// Bank
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bank {
    pub id: String,
    pub name: String,
    pub account_number: Option<String>,
    /// Materialized balance; must equal the signed sum of the bank's transactions.
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum BankTransactionKind {
    Deposit,
    Withdrawal,
}

string_enum!(BankTransactionKind { Deposit => "DEPOSIT", Withdrawal => "WITHDRAWAL" });

impl BankTransactionKind {
    /// Applies the sign of this kind to an unsigned amount.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            BankTransactionKind::Deposit => amount,
            BankTransactionKind::Withdrawal => -amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BankTransaction {
    pub id: String,
    pub bank_id: String,
    pub kind: BankTransactionKind,
    /// Always positive; the sign comes from `kind`.
    pub amount_cents: i64,
    pub loan_id: Option<String>,
    pub installment_id: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl BankTransaction {
    pub fn signed_amount(&self) -> Money {
        self.kind.signed(Money::from_cents(self.amount_cents))
    }
}

// =============================================================================
// Loan & Installment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum LoanStatus {
    Active,
    Paid,
}

string_enum!(LoanStatus { Active => "ACTIVE", Paid => "PAID" });

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Loan {
    pub id: String,
    pub bank_id: String,
    pub principal_cents: i64,
    pub interest_rate_bps: i64,
    pub interest_cents: i64,
    /// principal + interest; equals the sum of the installments.
    pub total_cents: i64,
    pub term_months: i64,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    pub status: LoanStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum InstallmentStatus {
    Pending,
    Paid,
}

string_enum!(InstallmentStatus { Pending => "PENDING", Paid => "PAID" });

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Installment {
    pub id: String,
    pub loan_id: String,
    /// 1-based position in the schedule.
    pub sequence: i64,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub installments: Vec<Installment>,
}

// =============================================================================
// Journal
// =============================================================================

/// A materialized signed cash movement, rebuilt by journal sync.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct JournalEntry {
    pub id: String,
    /// "TRANSACTION" or "ACCOUNT_RECORD".
    pub source_kind: String,
    pub source_id: String,
    pub agency_id: Option<String>,
    /// Positive for inflows, negative for outflows.
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub synced_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_rate() {
        let rate = InterestRate::from_bps(1250);
        assert_eq!(rate.bps(), 1250);
        assert!((rate.percentage() - 12.5).abs() < 0.001);
    }

    #[test]
    fn test_kind_parsing_is_case_insensitive() {
        assert_eq!("sale".parse::<TransactionKind>().unwrap(), TransactionKind::Sale);
        assert_eq!(
            "SUPPLY_PAYMENT".parse::<TransactionKind>().unwrap(),
            TransactionKind::SupplyPayment
        );
        assert!("refund".parse::<TransactionKind>().is_err());
        assert_eq!(TransactionKind::Collection.to_string(), "COLLECTION");
    }

    #[test]
    fn test_serde_names_match_storage_names() {
        for kind in TransactionKind::ALL {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        let role = serde_json::to_string(&UserRole::AgencyManager).unwrap();
        assert_eq!(role, "\"AGENCY_MANAGER\"");
    }

    #[test]
    fn test_stock_direction() {
        assert_eq!(TransactionKind::Sale.stock_direction(), -1);
        assert_eq!(TransactionKind::Purchase.stock_direction(), 1);
        assert_eq!(TransactionKind::Return.stock_direction(), 1);
        assert!(!TransactionKind::Collection.has_items());
    }

    #[test]
    fn test_bank_kind_sign() {
        let amount = Money::from_cents(500);
        assert_eq!(BankTransactionKind::Deposit.signed(amount).cents(), 500);
        assert_eq!(BankTransactionKind::Withdrawal.signed(amount).cents(), -500);
    }

    #[test]
    fn test_warehouse_consistency() {
        let mut wh = Warehouse {
            id: "u-1".to_string(),
            agency_id: None,
            name: "Van".to_string(),
            kind: WarehouseKind::Virtual,
            owner_user_id: Some("u-1".to_string()),
            created_at: Utc::now(),
        };
        assert!(wh.is_consistent());
        wh.owner_user_id = Some("u-2".to_string());
        assert!(!wh.is_consistent());
        wh.kind = WarehouseKind::Main;
        wh.owner_user_id = None;
        assert!(wh.is_consistent());
    }
}
