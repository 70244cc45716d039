//! # Reports
//!
//! Pure group-bys over rows the database layer already filtered by agency
//! and date range. Grouping uses `BTreeMap` so output order is stable.
//!
//! ## Debt Formulas
//! ```text
//! customer debt = Σ sale.remaining − Σ collection.paid − Σ return.remaining
//! supplier debt = Σ purchase.remaining − Σ supply_payment.paid
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::loan::outstanding;
use crate::money::Money;
use crate::types::{
    AccountRecord, AccountRecordKind, Bank, Customer, Installment, Loan, LoanStatus, Product,
    Supplier, Transaction, TransactionItem, TransactionKind,
};

// =============================================================================
// Date Range
// =============================================================================

/// Half-open `[from, to)` filter; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<Self, ValidationError> {
        if let (Some(f), Some(t)) = (from, to) {
            if f >= t {
                return Err(ValidationError::InvalidFormat {
                    field: "to".to_string(),
                    reason: "must be after from".to_string(),
                });
            }
        }
        Ok(DateRange { from, to })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |f| at >= f) && self.to.map_or(true, |t| at < t)
    }
}

// =============================================================================
// Sales Summary
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesTotals {
    pub count: u32,
    pub total: Money,
    pub paid: Money,
    pub remaining: Money,
}

impl SalesTotals {
    fn add(&mut self, tx: &Transaction) {
        self.count += 1;
        self.total += tx.total();
        self.paid += tx.paid();
        self.remaining += tx.remaining();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgencySales {
    pub agency_id: Option<String>,
    pub totals: SalesTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub day: NaiveDate,
    pub totals: SalesTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub overall: SalesTotals,
    pub by_agency: Vec<AgencySales>,
    pub by_day: Vec<DailySales>,
}

/// Summarizes the SALE rows in `transactions`; other kinds are skipped.
pub fn sales_report(transactions: &[Transaction]) -> SalesReport {
    let mut overall = SalesTotals::default();
    let mut by_agency: BTreeMap<Option<String>, SalesTotals> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, SalesTotals> = BTreeMap::new();

    for tx in transactions.iter().filter(|t| t.kind == TransactionKind::Sale) {
        overall.add(tx);
        by_agency.entry(tx.agency_id.clone()).or_default().add(tx);
        by_day.entry(tx.occurred_at.date_naive()).or_default().add(tx);
    }

    SalesReport {
        overall,
        by_agency: by_agency
            .into_iter()
            .map(|(agency_id, totals)| AgencySales { agency_id, totals })
            .collect(),
        by_day: by_day
            .into_iter()
            .map(|(day, totals)| DailySales { day, totals })
            .collect(),
    }
}

// =============================================================================
// Account Summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotal {
    pub kind: AccountRecordKind,
    pub category: String,
    pub count: u32,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountSummary {
    pub income: Money,
    pub expense: Money,
    /// income − expense
    pub net: Money,
    pub by_category: Vec<CategoryTotal>,
}

pub fn account_summary(records: &[AccountRecord]) -> AccountSummary {
    let mut income = Money::zero();
    let mut expense = Money::zero();
    let mut groups: BTreeMap<(&str, &str), (AccountRecordKind, u32, Money)> = BTreeMap::new();

    for r in records {
        let amount = Money::from_cents(r.amount_cents);
        match r.kind {
            AccountRecordKind::Income => income += amount,
            AccountRecordKind::Expense => expense += amount,
        }
        let slot = groups
            .entry((r.kind.as_str(), r.category.as_str()))
            .or_insert((r.kind, 0, Money::zero()));
        slot.1 += 1;
        slot.2 += amount;
    }

    let by_category = groups
        .into_iter()
        .map(|((_, category), (kind, count, amount))| CategoryTotal {
            kind,
            category: category.to_string(),
            count,
            amount,
        })
        .collect();

    AccountSummary {
        income,
        expense,
        net: income - expense,
        by_category,
    }
}

// =============================================================================
// Product Sales
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// Quantity and revenue per product over sale line items, highest revenue
/// first (ties by SKU). Items of unknown products are reported under their id.
pub fn product_sales(items: &[TransactionItem], products: &[Product]) -> Vec<ProductSales> {
    let catalogue: BTreeMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut totals: BTreeMap<&str, (i64, Money)> = BTreeMap::new();
    for item in items {
        let slot = totals.entry(item.product_id.as_str()).or_default();
        slot.0 += item.quantity;
        slot.1 += Money::from_cents(item.line_total_cents);
    }

    let mut rows: Vec<ProductSales> = totals
        .into_iter()
        .map(|(id, (quantity, revenue))| {
            let (sku, name) = catalogue
                .get(id)
                .map(|p| (p.sku.clone(), p.name.clone()))
                .unwrap_or_else(|| (id.to_string(), id.to_string()));
            ProductSales {
                product_id: id.to_string(),
                sku,
                name,
                quantity,
                revenue,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.sku.cmp(&b.sku)));
    rows
}

// =============================================================================
// Debts
// =============================================================================

/// How a party's balance is built up.
///
/// For customers: `charged` is sale remaining, `settled` is collections,
/// `credited` is return remaining. Suppliers have no credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DebtStatement {
    pub party_id: String,
    pub name: String,
    pub charged: Money,
    pub settled: Money,
    pub credited: Money,
    /// charged − settled − credited
    pub balance: Money,
}

impl DebtStatement {
    fn new(party_id: &str, name: &str) -> Self {
        DebtStatement {
            party_id: party_id.to_string(),
            name: name.to_string(),
            charged: Money::zero(),
            settled: Money::zero(),
            credited: Money::zero(),
            balance: Money::zero(),
        }
    }

    fn finish(mut self) -> Self {
        self.balance = self.charged - self.settled - self.credited;
        self
    }
}

pub fn customer_statement(customer: &Customer, transactions: &[Transaction]) -> DebtStatement {
    let mut s = DebtStatement::new(&customer.id, &customer.name);
    for tx in transactions
        .iter()
        .filter(|t| t.customer_id.as_deref() == Some(customer.id.as_str()))
    {
        match tx.kind {
            TransactionKind::Sale => s.charged += tx.remaining(),
            TransactionKind::Collection => s.settled += tx.paid(),
            TransactionKind::Return => s.credited += tx.remaining(),
            TransactionKind::Purchase | TransactionKind::SupplyPayment => {}
        }
    }
    s.finish()
}

pub fn supplier_statement(supplier: &Supplier, transactions: &[Transaction]) -> DebtStatement {
    let mut s = DebtStatement::new(&supplier.id, &supplier.name);
    for tx in transactions
        .iter()
        .filter(|t| t.supplier_id.as_deref() == Some(supplier.id.as_str()))
    {
        match tx.kind {
            TransactionKind::Purchase => s.charged += tx.remaining(),
            TransactionKind::SupplyPayment => s.settled += tx.paid(),
            _ => {}
        }
    }
    s.finish()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DebtReport {
    /// What customers owe us.
    pub customers: Vec<DebtStatement>,
    /// What we owe suppliers.
    pub suppliers: Vec<DebtStatement>,
    pub receivable: Money,
    pub payable: Money,
}

/// Statements of every party whose balance is not zero.
pub fn debt_report(customers: &[Customer], suppliers: &[Supplier], transactions: &[Transaction]) -> DebtReport {
    let customers: Vec<DebtStatement> = customers
        .iter()
        .map(|c| customer_statement(c, transactions))
        .filter(|s| !s.balance.is_zero())
        .collect();
    let suppliers: Vec<DebtStatement> = suppliers
        .iter()
        .map(|s| supplier_statement(s, transactions))
        .filter(|s| !s.balance.is_zero())
        .collect();
    DebtReport {
        receivable: customers.iter().map(|s| s.balance).sum(),
        payable: suppliers.iter().map(|s| s.balance).sum(),
        customers,
        suppliers,
    }
}

// =============================================================================
// Loans
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BankLoanExposure {
    pub bank_id: String,
    pub bank_name: String,
    pub active_loans: u32,
    /// Principal of the active loans.
    pub principal: Money,
    /// Principal plus interest of the active loans.
    pub total: Money,
    /// Pending installments across the active loans.
    pub outstanding: Money,
}

/// Per-bank exposure; banks without active loans are omitted.
pub fn loan_report(banks: &[Bank], loans: &[Loan], installments: &[Installment]) -> Vec<BankLoanExposure> {
    let mut by_loan: BTreeMap<&str, Vec<Installment>> = BTreeMap::new();
    for inst in installments {
        by_loan.entry(inst.loan_id.as_str()).or_default().push(inst.clone());
    }

    banks
        .iter()
        .filter_map(|bank| {
            let active: Vec<&Loan> = loans
                .iter()
                .filter(|l| l.bank_id == bank.id && l.status == LoanStatus::Active)
                .collect();
            if active.is_empty() {
                return None;
            }
            Some(BankLoanExposure {
                bank_id: bank.id.clone(),
                bank_name: bank.name.clone(),
                active_loans: active.len() as u32,
                principal: active.iter().map(|l| Money::from_cents(l.principal_cents)).sum(),
                total: active.iter().map(|l| Money::from_cents(l.total_cents)).sum(),
                outstanding: active
                    .iter()
                    .map(|l| by_loan.get(l.id.as_str()).map_or(Money::zero(), |rows| outstanding(rows)))
                    .sum(),
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
