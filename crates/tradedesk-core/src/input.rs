//! # Input Types
//!
//! Payloads of the back-office form actions. Each carries a `validate()`
//! that runs the pure checks before any database work starts; checks that
//! need stored state (stock, bank balance) run inside the repository
//! transaction instead.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AccountRecordKind, TransactionKind, UserRole};
use crate::validation::{
    validate_code, validate_email, validate_interest_rate, validate_line_count, validate_loan_term,
    validate_name, validate_non_negative, validate_positive, validate_quantity, validate_sku,
    ValidationResult,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAgency {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewAgency {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_code(&self.code)
    }
}

/// Payload for a MAIN warehouse. Virtual warehouses are only created
/// together with their sales representative, see [`NewUser`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewWarehouse {
    pub name: String,
    #[serde(default)]
    pub agency_id: Option<String>,
}

impl NewWarehouse {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub agency_id: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_email(&self.email)?;
        if self.role != UserRole::Admin && self.agency_id.is_none() {
            return Err(ValidationError::Required {
                field: "agency_id".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    #[serde(default)]
    pub agency_id: Option<String>,
}

fn default_unit() -> String {
    "unit".to_string()
}

impl NewProduct {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_sku(&self.sku)?;
        validate_name("name", &self.name)?;
        validate_name("unit", &self.unit)?;
        validate_non_negative("purchase_price_cents", self.purchase_price_cents)?;
        validate_non_negative("sale_price_cents", self.sale_price_cents)
    }
}

/// Customer or supplier payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewParty {
    pub name: String,
    #[serde(default)]
    pub agency_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewParty {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)
    }
}

// =============================================================================
// Trading
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineInput {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to the product's sale price (SALE/RETURN) or purchase price (PURCHASE).
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

/// Sale, purchase invoice or return.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInvoice {
    #[serde(default)]
    pub agency_id: Option<String>,
    pub warehouse_id: String,
    /// Required for SALE and RETURN.
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Required for PURCHASE.
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub items: Vec<LineInput>,
    /// Cash paid now (refunded now, for a RETURN). The rest becomes debt/credit.
    #[serde(default)]
    pub paid_cents: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewInvoice {
    pub fn validate(&self, kind: TransactionKind) -> CoreResult<()> {
        if !kind.has_items() {
            return Err(CoreError::WrongTransactionKind {
                actual: kind.to_string(),
                operation: "invoice".to_string(),
            });
        }
        validate_line_count(self.items.len())?;
        for line in &self.items {
            validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price_cents {
                validate_non_negative("unit_price_cents", price)?;
            }
        }
        validate_non_negative("paid_cents", self.paid_cents)?;
        let party_missing = match kind {
            TransactionKind::Sale | TransactionKind::Return => {
                self.customer_id.is_none().then_some("customer_id")
            }
            TransactionKind::Purchase => self.supplier_id.is_none().then_some("supplier_id"),
            _ => None,
        };
        if let Some(field) = party_missing {
            return Err(ValidationError::Required {
                field: field.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Collection from a customer or payment to a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayment {
    #[serde(default)]
    pub agency_id: Option<String>,
    /// The customer (COLLECTION) or supplier (SUPPLY_PAYMENT).
    pub party_id: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewPayment {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive("amount_cents", self.amount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockTransfer {
    pub product_id: String,
    pub from_warehouse_id: String,
    pub to_warehouse_id: String,
    pub quantity: i64,
}

impl StockTransfer {
    pub fn validate(&self) -> CoreResult<()> {
        validate_quantity(self.quantity)?;
        if self.from_warehouse_id == self.to_warehouse_id {
            return Err(CoreError::SameWarehouse(self.from_warehouse_id.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// Accounts, Banks, Loans
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAccountRecord {
    pub kind: AccountRecordKind,
    pub category: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub agency_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewAccountRecord {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("category", &self.category)?;
        validate_positive("amount_cents", self.amount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBank {
    pub name: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub opening_balance_cents: i64,
}

impl NewBank {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_non_negative("opening_balance_cents", self.opening_balance_cents)
    }
}

/// Deposit into or withdrawal from a bank.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BankMovement {
    pub amount_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl BankMovement {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive("amount_cents", self.amount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLoan {
    pub bank_id: String,
    pub principal_cents: i64,
    /// Flat rate over the whole loan, in basis points.
    pub interest_rate_bps: u32,
    pub term_months: u32,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
}

impl NewLoan {
    pub fn validate(&self) -> CoreResult<()> {
        validate_positive("principal_cents", self.principal_cents)?;
        validate_interest_rate(self.interest_rate_bps)?;
        validate_loan_term(self.term_months)
    }
}
