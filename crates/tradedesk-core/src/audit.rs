//! # Audit
//!
//! Drift checks between derived and materialized values. Each check takes
//! rows already loaded by the database layer and returns a finding when an
//! invariant does not hold.
//!
//! ```text
//! check                     compares
//! ────────────────────────  ──────────────────────────────────────────────
//! TREASURY_DRIFT            treasury formula  vs  journal entry sum
//! BANK_BALANCE_DRIFT        bank.balance      vs  Σ signed bank transactions
//! UNBALANCED_TRANSACTION    paid + remaining  vs  total (and signs)
//! ITEM_TOTAL_MISMATCH       Σ line totals     vs  transaction total
//! LOAN_SCHEDULE_MISMATCH    Σ installments    vs  loan total
//! VIRTUAL_WAREHOUSE_MISMATCH  warehouse id    vs  owner user id
//! NEGATIVE_STOCK            quantity          vs  0
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::treasury::{CashMovement, TreasuryScope};
use crate::types::{Bank, Installment, JournalEntry, Loan, Stock, Transaction, TransactionItem, Warehouse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum FindingKind {
    TreasuryDrift,
    BankBalanceDrift,
    UnbalancedTransaction,
    ItemTotalMismatch,
    LoanScheduleMismatch,
    VirtualWarehouseMismatch,
    NegativeStock,
}

/// One invariant violation. `expected` is the derived value, `actual` the
/// stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuditFinding {
    pub kind: FindingKind,
    pub subject_id: String,
    pub expected: i64,
    pub actual: i64,
    pub message: String,
}

/// Treasury vs journal for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScopeCheck {
    pub scope: TreasuryScope,
    pub treasury: Money,
    pub journal: Money,
    /// treasury − journal
    pub drift: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuditReport {
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub scopes: Vec<ScopeCheck>,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }
}

// =============================================================================
// Journal
// =============================================================================

/// Materializes a movement as a journal row.
pub fn journal_entry(movement: &CashMovement, id: String, synced_at: DateTime<Utc>) -> JournalEntry {
    JournalEntry {
        id,
        source_kind: movement.source.table().to_string(),
        source_id: movement.source_id.clone(),
        agency_id: movement.agency_id.clone(),
        amount_cents: movement.amount.cents(),
        occurred_at: movement.occurred_at,
        synced_at,
    }
}

pub fn journal_balance(entries: &[JournalEntry], scope: &TreasuryScope) -> Money {
    entries
        .iter()
        .filter(|e| scope.matches(e.agency_id.as_deref()))
        .map(|e| Money::from_cents(e.amount_cents))
        .sum()
}

/// Outcome of a journal rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JournalSync {
    pub entries: u32,
    /// Sum of every entry; equals the general treasury balance.
    pub balance: Money,
    #[ts(as = "String")]
    pub synced_at: DateTime<Utc>,
}

/// A bank whose stored balance was reset to its signed transaction sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BankCorrection {
    pub bank_id: String,
    pub bank_name: String,
    pub stored: Money,
    pub corrected: Money,
}

// =============================================================================
// Checks
// =============================================================================

pub fn check_scope(scope: TreasuryScope, treasury: Money, journal: Money) -> (ScopeCheck, Option<AuditFinding>) {
    let drift = treasury - journal;
    let finding = (!drift.is_zero()).then(|| AuditFinding {
        kind: FindingKind::TreasuryDrift,
        subject_id: scope.agency_id().unwrap_or("general").to_string(),
        expected: treasury.cents(),
        actual: journal.cents(),
        message: format!("treasury {treasury} differs from journal {journal}"),
    });
    (
        ScopeCheck {
            scope,
            treasury,
            journal,
            drift,
        },
        finding,
    )
}

pub fn check_bank(bank: &Bank, signed_sum: Money) -> Option<AuditFinding> {
    (bank.balance_cents != signed_sum.cents()).then(|| AuditFinding {
        kind: FindingKind::BankBalanceDrift,
        subject_id: bank.id.clone(),
        expected: signed_sum.cents(),
        actual: bank.balance_cents,
        message: format!(
            "bank {} stores {} but its transactions sum to {}",
            bank.name,
            Money::from_cents(bank.balance_cents),
            signed_sum
        ),
    })
}

pub fn check_transaction(tx: &Transaction) -> Option<AuditFinding> {
    (!tx.amounts_balanced()).then(|| AuditFinding {
        kind: FindingKind::UnbalancedTransaction,
        subject_id: tx.id.clone(),
        expected: tx.total_cents,
        actual: tx.paid_cents.saturating_add(tx.remaining_cents),
        message: format!(
            "{} {}: paid {} + remaining {} vs total {}",
            tx.kind,
            tx.reference,
            tx.paid(),
            tx.remaining(),
            tx.total()
        ),
    })
}

/// Line totals must equal quantity × price and add up to the transaction
/// total. Transactions without items are not checked.
pub fn check_transaction_items(tx: &Transaction, items: &[TransactionItem]) -> Option<AuditFinding> {
    if items.is_empty() {
        return None;
    }
    let bad_line = items
        .iter()
        .find(|i| i.quantity.checked_mul(i.unit_price_cents) != Some(i.line_total_cents));
    let sum = items
        .iter()
        .fold(0i64, |acc, i| acc.saturating_add(i.line_total_cents));
    if bad_line.is_none() && sum == tx.total_cents {
        return None;
    }
    let message = match bad_line {
        Some(line) => format!(
            "{} line {}: {} × {} recorded as {}",
            tx.reference, line.id, line.quantity, line.unit_price_cents, line.line_total_cents
        ),
        None => format!("{} items sum to {} but total is {}", tx.reference, sum, tx.total_cents),
    };
    Some(AuditFinding {
        kind: FindingKind::ItemTotalMismatch,
        subject_id: tx.id.clone(),
        expected: sum,
        actual: tx.total_cents,
        message,
    })
}

pub fn check_loan(loan: &Loan, installments: &[Installment]) -> Option<AuditFinding> {
    let sum = installments
        .iter()
        .fold(0i64, |acc, i| acc.saturating_add(i.amount_cents));
    (sum != loan.total_cents).then(|| AuditFinding {
        kind: FindingKind::LoanScheduleMismatch,
        subject_id: loan.id.clone(),
        expected: loan.total_cents,
        actual: sum,
        message: format!(
            "loan {}: {} installments sum to {}, total is {}",
            loan.id,
            installments.len(),
            Money::from_cents(sum),
            Money::from_cents(loan.total_cents)
        ),
    })
}

pub fn check_warehouse(warehouse: &Warehouse) -> Option<AuditFinding> {
    (!warehouse.is_consistent()).then(|| AuditFinding {
        kind: FindingKind::VirtualWarehouseMismatch,
        subject_id: warehouse.id.clone(),
        expected: 0,
        actual: 0,
        message: format!(
            "{} warehouse {} has owner {:?}",
            warehouse.kind, warehouse.id, warehouse.owner_user_id
        ),
    })
}

pub fn check_stock(stock: &Stock) -> Option<AuditFinding> {
    (stock.quantity < 0).then(|| AuditFinding {
        kind: FindingKind::NegativeStock,
        subject_id: format!("{}@{}", stock.product_id, stock.warehouse_id),
        expected: 0,
        actual: stock.quantity,
        message: format!(
            "product {} in warehouse {} has quantity {}",
            stock.product_id, stock.warehouse_id, stock.quantity
        ),
    })
}
