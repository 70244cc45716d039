//! # Treasury
//!
//! Derives the cash balance, general or per agency, from transaction and
//! account-record history. Nothing here is cached: the database layer
//! re-reads every matching row and hands it to these functions on each
//! request.
//!
//! ## The Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balance =  Σ sale.paid                                                 │
//! │           − Σ purchase.paid                                             │
//! │           + Σ collection.paid                                           │
//! │           + Σ income.amount                                             │
//! │           − Σ expense.amount                                            │
//! │                                                                         │
//! │  RETURN and SUPPLY_PAYMENT rows are not terms: their cash side is an   │
//! │  EXPENSE record written in the same database transaction.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Running Ledger
//! Movements are ordered by `occurred_at`, ties broken by source id, so two
//! reads of the same rows always produce the same lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{AccountRecord, AccountRecordKind, Transaction, TransactionKind};

// =============================================================================
// Scope
// =============================================================================

/// Which rows take part in a treasury computation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "scope", content = "agency_id", rename_all = "snake_case")]
#[ts(export)]
pub enum TreasuryScope {
    /// Every row, whatever its agency (including rows with no agency).
    #[default]
    General,
    /// Only rows tagged with this agency.
    Agency(String),
}

impl TreasuryScope {
    pub fn from_agency(agency_id: Option<String>) -> Self {
        match agency_id {
            Some(id) => TreasuryScope::Agency(id),
            None => TreasuryScope::General,
        }
    }

    pub fn agency_id(&self) -> Option<&str> {
        match self {
            TreasuryScope::General => None,
            TreasuryScope::Agency(id) => Some(id.as_str()),
        }
    }

    pub fn matches(&self, agency_id: Option<&str>) -> bool {
        match self {
            TreasuryScope::General => true,
            TreasuryScope::Agency(id) => agency_id == Some(id.as_str()),
        }
    }
}

// =============================================================================
// Cash Movement
// =============================================================================

/// The formula term a movement contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MovementSource {
    Sale,
    Purchase,
    Collection,
    Income,
    Expense,
}

impl MovementSource {
    /// Storage tag of the table the movement came from.
    pub const fn table(&self) -> &'static str {
        match self {
            MovementSource::Sale | MovementSource::Purchase | MovementSource::Collection => {
                "TRANSACTION"
            }
            MovementSource::Income | MovementSource::Expense => "ACCOUNT_RECORD",
        }
    }
}

/// One signed cash movement derived from a source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashMovement {
    pub source: MovementSource,
    pub source_id: String,
    pub agency_id: Option<String>,
    /// Positive for inflows, negative for outflows.
    pub amount: Money,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    /// Document reference or account category, for display.
    pub label: String,
}

impl CashMovement {
    /// Classifies a trading transaction.
    ///
    /// Returns `None` for kinds outside the formula and for rows with
    /// nothing paid.
    pub fn from_transaction(tx: &Transaction) -> Option<Self> {
        let (source, amount) = match tx.kind {
            TransactionKind::Sale => (MovementSource::Sale, tx.paid()),
            TransactionKind::Purchase => (MovementSource::Purchase, -tx.paid()),
            TransactionKind::Collection => (MovementSource::Collection, tx.paid()),
            TransactionKind::Return | TransactionKind::SupplyPayment => return None,
        };
        if amount.is_zero() {
            return None;
        }
        Some(CashMovement {
            source,
            source_id: tx.id.clone(),
            agency_id: tx.agency_id.clone(),
            amount,
            occurred_at: tx.occurred_at,
            label: tx.reference.clone(),
        })
    }

    pub fn from_account_record(record: &AccountRecord) -> Self {
        let amount = Money::from_cents(record.amount_cents);
        let (source, amount) = match record.kind {
            AccountRecordKind::Income => (MovementSource::Income, amount),
            AccountRecordKind::Expense => (MovementSource::Expense, -amount),
        };
        CashMovement {
            source,
            source_id: record.id.clone(),
            agency_id: record.agency_id.clone(),
            amount,
            occurred_at: record.occurred_at,
            label: record.category.clone(),
        }
    }
}

/// Builds every movement from raw rows, keeping only those in `scope`.
pub fn collect_movements(
    transactions: &[Transaction],
    records: &[AccountRecord],
    scope: &TreasuryScope,
) -> Vec<CashMovement> {
    transactions
        .iter()
        .filter_map(CashMovement::from_transaction)
        .chain(records.iter().map(CashMovement::from_account_record))
        .filter(|m| scope.matches(m.agency_id.as_deref()))
        .collect()
}

// =============================================================================
// Breakdown
// =============================================================================

/// The five formula terms, each as a non-negative magnitude, and the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasuryBreakdown {
    pub sales_paid: Money,
    pub purchases_paid: Money,
    pub collections: Money,
    pub income: Money,
    pub expense: Money,
    pub balance: Money,
    pub movement_count: u32,
}

impl TreasuryBreakdown {
    pub fn from_movements<'a, I>(movements: I) -> Self
    where
        I: IntoIterator<Item = &'a CashMovement>,
    {
        let mut out = TreasuryBreakdown::default();
        for m in movements {
            let magnitude = m.amount.abs();
            match m.source {
                MovementSource::Sale => out.sales_paid += magnitude,
                MovementSource::Purchase => out.purchases_paid += magnitude,
                MovementSource::Collection => out.collections += magnitude,
                MovementSource::Income => out.income += magnitude,
                MovementSource::Expense => out.expense += magnitude,
            }
            out.movement_count += 1;
        }
        out.balance = out.formula_balance();
        out
    }

    /// Σ sale − Σ purchase + Σ collection + Σ income − Σ expense.
    pub fn formula_balance(&self) -> Money {
        self.sales_paid - self.purchases_paid + self.collections + self.income - self.expense
    }
}

// =============================================================================
// Running Ledger
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerLine {
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    pub source: MovementSource,
    pub source_id: String,
    pub agency_id: Option<String>,
    pub label: String,
    pub inflow: Money,
    pub outflow: Money,
    /// Balance after this line.
    pub balance: Money,
}

/// Sorts movements chronologically and accumulates a running balance
/// starting from `opening`.
pub fn running_ledger(mut movements: Vec<CashMovement>, opening: Money) -> Vec<LedgerLine> {
    sort_chronologically(&mut movements);
    let mut balance = opening;
    movements
        .into_iter()
        .map(|m| {
            balance += m.amount;
            let (inflow, outflow) = if m.amount.is_negative() {
                (Money::zero(), m.amount.abs())
            } else {
                (m.amount, Money::zero())
            };
            LedgerLine {
                occurred_at: m.occurred_at,
                source: m.source,
                source_id: m.source_id,
                agency_id: m.agency_id,
                label: m.label,
                inflow,
                outflow,
                balance,
            }
        })
        .collect()
}

pub fn sort_chronologically(movements: &mut [CashMovement]) {
    movements.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
}

// =============================================================================
// Period Summary
// =============================================================================

/// Treasury over a half-open period `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasurySummary {
    pub scope: TreasuryScope,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    /// Balance of every movement before `from`.
    pub opening_balance: Money,
    /// Terms of the movements inside the period.
    pub period: TreasuryBreakdown,
    /// opening + period balance.
    pub closing_balance: Money,
}

/// Splits scoped movements into before/inside the period and sums them.
///
/// Movements at or after `to` are ignored entirely.
pub fn summarize_period(
    movements: &[CashMovement],
    scope: TreasuryScope,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> TreasurySummary {
    let before_end = |m: &&CashMovement| to.map_or(true, |t| m.occurred_at < t);
    let opening_balance: Money = movements
        .iter()
        .filter(before_end)
        .filter(|m| from.is_some_and(|f| m.occurred_at < f))
        .map(|m| m.amount)
        .sum();
    let period = TreasuryBreakdown::from_movements(
        movements
            .iter()
            .filter(before_end)
            .filter(|m| from.map_or(true, |f| m.occurred_at >= f)),
    );
    TreasurySummary {
        scope,
        from,
        to,
        opening_balance,
        closing_balance: opening_balance + period.balance,
        period,
    }
}

/// Ledger lines inside `[from, to)`, opened with the balance of everything
/// before `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodLedger {
    pub scope: TreasuryScope,
    pub opening_balance: Money,
    pub lines: Vec<LedgerLine>,
    pub closing_balance: Money,
}

pub fn period_ledger(
    movements: Vec<CashMovement>,
    scope: TreasuryScope,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> PeriodLedger {
    let (before, inside): (Vec<CashMovement>, Vec<CashMovement>) = movements
        .into_iter()
        .filter(|m| to.map_or(true, |t| m.occurred_at < t))
        .partition(|m| from.is_some_and(|f| m.occurred_at < f));
    let opening_balance: Money = before.iter().map(|m| m.amount).sum();
    let lines = running_ledger(inside, opening_balance);
    let closing_balance = lines.last().map_or(opening_balance, |l| l.balance);
    PeriodLedger {
        scope,
        opening_balance,
        lines,
        closing_balance,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 9, 0, 0).unwrap()
    }

    fn tx(id: &str, kind: TransactionKind, agency: Option<&str>, total: i64, paid: i64, day: u32) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind,
            agency_id: agency.map(str::to_string),
            warehouse_id: None,
            customer_id: None,
            supplier_id: None,
            reference: format!("REF-{id}"),
            total_cents: total,
            paid_cents: paid,
            remaining_cents: total - paid,
            note: None,
            occurred_at: at(day),
            created_at: at(day),
        }
    }

    fn record(id: &str, kind: AccountRecordKind, agency: Option<&str>, amount: i64, day: u32) -> AccountRecord {
        AccountRecord {
            id: id.to_string(),
            kind,
            agency_id: agency.map(str::to_string),
            customer_id: None,
            supplier_id: None,
            category: "rent".to_string(),
            amount_cents: amount,
            description: None,
            occurred_at: at(day),
            created_at: at(day),
        }
    }

    fn fixture() -> (Vec<Transaction>, Vec<AccountRecord>) {
        let txs = vec![
            tx("t1", TransactionKind::Sale, Some("a1"), 10_000, 6_000, 2),
            tx("t2", TransactionKind::Purchase, Some("a1"), 8_000, 5_000, 3),
            tx("t3", TransactionKind::Collection, Some("a2"), 2_000, 2_000, 4),
            tx("t4", TransactionKind::Return, Some("a1"), 1_000, 1_000, 5),
            tx("t5", TransactionKind::SupplyPayment, Some("a1"), 3_000, 3_000, 5),
            tx("t6", TransactionKind::Sale, None, 500, 500, 6),
        ];
        let records = vec![
            record("r1", AccountRecordKind::Income, Some("a2"), 700, 1),
            record("r2", AccountRecordKind::Expense, Some("a1"), 300, 7),
        ];
        (txs, records)
    }

    #[test]
    fn test_formula_general_scope() {
        let (txs, records) = fixture();
        let movements = collect_movements(&txs, &records, &TreasuryScope::General);
        let b = TreasuryBreakdown::from_movements(&movements);

        assert_eq!(b.sales_paid.cents(), 6_500);
        assert_eq!(b.purchases_paid.cents(), 5_000);
        assert_eq!(b.collections.cents(), 2_000);
        assert_eq!(b.income.cents(), 700);
        assert_eq!(b.expense.cents(), 300);
        // 6500 - 5000 + 2000 + 700 - 300
        assert_eq!(b.balance.cents(), 3_900);
        assert_eq!(b.movement_count, 6);
    }

    #[test]
    fn test_returns_and_supply_payments_are_not_terms() {
        let (txs, _) = fixture();
        assert!(CashMovement::from_transaction(&txs[3]).is_none());
        assert!(CashMovement::from_transaction(&txs[4]).is_none());
    }

    #[test]
    fn test_general_equals_agency_scopes_plus_unscoped() {
        let (txs, records) = fixture();
        let balance = |scope: TreasuryScope| {
            TreasuryBreakdown::from_movements(&collect_movements(&txs, &records, &scope)).balance
        };
        let a1 = balance(TreasuryScope::Agency("a1".to_string()));
        let a2 = balance(TreasuryScope::Agency("a2".to_string()));
        let unscoped = Money::from_cents(500);

        assert_eq!(a1.cents(), 6_000 - 5_000 - 300);
        assert_eq!(a2.cents(), 2_000 + 700);
        assert_eq!(balance(TreasuryScope::General), a1 + a2 + unscoped);
    }

    #[test]
    fn test_running_ledger_is_chronological() {
        let (txs, records) = fixture();
        let movements = collect_movements(&txs, &records, &TreasuryScope::General);
        let lines = running_ledger(movements, Money::from_cents(1_000));

        let ids: Vec<&str> = lines.iter().map(|l| l.source_id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "t1", "t2", "t3", "t6", "r2"]);
        assert_eq!(lines[0].balance.cents(), 1_700);
        assert_eq!(lines[2].outflow.cents(), 5_000);
        assert_eq!(lines.last().unwrap().balance.cents(), 1_000 + 3_900);
    }

    #[test]
    fn test_ledger_ties_break_by_source_id() {
        let txs = vec![
            tx("b", TransactionKind::Sale, None, 100, 100, 2),
            tx("a", TransactionKind::Sale, None, 100, 100, 2),
        ];
        let lines = running_ledger(collect_movements(&txs, &[], &TreasuryScope::General), Money::zero());
        assert_eq!(lines[0].source_id, "a");
        assert_eq!(lines[1].source_id, "b");
    }

    #[test]
    fn test_unpaid_sale_is_not_a_movement() {
        let sale = tx("t", TransactionKind::Sale, None, 1_000, 0, 1);
        assert!(CashMovement::from_transaction(&sale).is_none());
    }

    #[test]
    fn test_summarize_period_splits_opening_and_period() {
        let (txs, records) = fixture();
        let movements = collect_movements(&txs, &records, &TreasuryScope::General);
        let summary = summarize_period(&movements, TreasuryScope::General, Some(at(3)), Some(at(6)));

        // before day 3: r1 (+700), t1 (+6000)
        assert_eq!(summary.opening_balance.cents(), 6_700);
        // days 3..6: t2 (-5000), t3 (+2000)
        assert_eq!(summary.period.balance.cents(), -3_000);
        assert_eq!(summary.period.movement_count, 2);
        assert_eq!(summary.closing_balance.cents(), 3_700);
    }

    #[test]
    fn test_summarize_without_bounds_matches_breakdown() {
        let (txs, records) = fixture();
        let movements = collect_movements(&txs, &records, &TreasuryScope::General);
        let summary = summarize_period(&movements, TreasuryScope::General, None, None);
        assert!(summary.opening_balance.is_zero());
        assert_eq!(summary.closing_balance, TreasuryBreakdown::from_movements(&movements).balance);
    }

    #[test]
    fn test_scope_serialization() {
        let json = serde_json::to_string(&TreasuryScope::Agency("a1".to_string())).unwrap();
        assert_eq!(json, r#"{"scope":"agency","agency_id":"a1"}"#);
        assert_eq!(TreasuryScope::from_agency(None), TreasuryScope::General);
    }

    #[test]
    fn test_period_ledger_opens_with_prior_balance() {
        let (txs, records) = fixture();
        let movements = collect_movements(&txs, &records, &TreasuryScope::General);
        let ledger = period_ledger(movements, TreasuryScope::General, Some(at(3)), None);

        assert_eq!(ledger.opening_balance.cents(), 6_700);
        assert_eq!(ledger.lines.len(), 4);
        assert_eq!(ledger.lines[0].source_id, "t2");
        assert_eq!(ledger.closing_balance.cents(), 3_900);
    }
}
