//! # Report Repository
//!
//! Loads rows and hands them to the pure aggregations in
//! `tradedesk_core::reports`. Nothing here writes.

use std::collections::HashSet;

use sqlx::SqlitePool;

use super::account::{AccountFilter, AccountRepository};
use super::transaction::{TransactionFilter, TransactionRepository};
use crate::error::DbResult;
use tradedesk_core::reports::{
    account_summary, debt_report, loan_report, product_sales, sales_report, AccountSummary, BankLoanExposure,
    DateRange, DebtReport, ProductSales, SalesReport,
};
use tradedesk_core::{Bank, Customer, Installment, Loan, Product, Supplier, Transaction, TransactionItem, TransactionKind};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    fn sales_filter(agency_id: Option<&str>, range: DateRange) -> TransactionFilter {
        TransactionFilter {
            kind: Some(TransactionKind::Sale),
            agency_id: agency_id.map(str::to_string),
            range,
            ..Default::default()
        }
    }

    /// Sales totals overall, per agency and per day.
    pub async fn sales(&self, agency_id: Option<&str>, range: DateRange) -> DbResult<SalesReport> {
        let sales = TransactionRepository::new(self.pool.clone())
            .list(&Self::sales_filter(agency_id, range))
            .await?;
        Ok(sales_report(&sales))
    }

    /// Income and expense per category.
    pub async fn accounts(&self, agency_id: Option<&str>, range: DateRange) -> DbResult<AccountSummary> {
        let records = AccountRepository::new(self.pool.clone())
            .list(&AccountFilter {
                kind: None,
                agency_id: agency_id.map(str::to_string),
                range,
            })
            .await?;
        Ok(account_summary(&records))
    }

    /// Units sold and revenue per product, best sellers first.
    pub async fn products(&self, agency_id: Option<&str>, range: DateRange) -> DbResult<Vec<ProductSales>> {
        let sales = TransactionRepository::new(self.pool.clone())
            .list(&Self::sales_filter(agency_id, range))
            .await?;
        let ids: HashSet<&str> = sales.iter().map(|t| t.id.as_str()).collect();

        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT ti.* FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            WHERE t.kind = 'SALE'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let items: Vec<TransactionItem> = items
            .into_iter()
            .filter(|i| ids.contains(i.transaction_id.as_str()))
            .collect();

        let products = sqlx::query_as::<_, Product>("SELECT * FROM products")
            .fetch_all(&self.pool)
            .await?;
        Ok(product_sales(&items, &products))
    }

    /// Receivables and payables of every party with a non-zero balance.
    pub async fn debts(&self, agency_id: Option<&str>) -> DbResult<DebtReport> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE (?1 IS NULL OR agency_id = ?1) ORDER BY name",
        )
        .bind(agency_id)
        .fetch_all(&self.pool)
        .await?;
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE (?1 IS NULL OR agency_id = ?1) ORDER BY name",
        )
        .bind(agency_id)
        .fetch_all(&self.pool)
        .await?;
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE customer_id IS NOT NULL OR supplier_id IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(debt_report(&customers, &suppliers, &transactions))
    }

    /// Active-loan exposure per bank.
    pub async fn loans(&self) -> DbResult<Vec<BankLoanExposure>> {
        let banks = sqlx::query_as::<_, Bank>("SELECT * FROM banks ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans")
            .fetch_all(&self.pool)
            .await?;
        let installments = sqlx::query_as::<_, Installment>("SELECT * FROM installments")
            .fetch_all(&self.pool)
            .await?;
        Ok(loan_report(&banks, &loans, &installments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use tradedesk_core::input::{LineInput, NewBank, NewInvoice, NewLoan, NewParty, NewPayment, NewProduct, NewWarehouse};

    async fn trading_db() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db
            .warehouses()
            .create(&NewWarehouse {
                name: "Main".to_string(),
                agency_id: None,
            })
            .await
            .unwrap();
        let mut product_ids = Vec::new();
        for (sku, price) in [("FLOUR-50", 2_000), ("SALT-1", 50)] {
            let p = db
                .products()
                .create(&NewProduct {
                    sku: sku.to_string(),
                    name: sku.to_string(),
                    unit: "unit".to_string(),
                    purchase_price_cents: price / 2,
                    sale_price_cents: price,
                    agency_id: None,
                })
                .await
                .unwrap();
            product_ids.push(p.id);
        }
        let party = |name: &str| NewParty {
            name: name.to_string(),
            agency_id: None,
            phone: None,
            address: None,
        };
        let customer = db.customers().create(&party("Bakery")).await.unwrap();
        let supplier = db.suppliers().create(&party("Wholesaler")).await.unwrap();

        let lines = |qty: i64| {
            product_ids
                .iter()
                .map(|id| LineInput {
                    product_id: id.clone(),
                    quantity: qty,
                    unit_price_cents: None,
                })
                .collect::<Vec<_>>()
        };
        db.transactions()
            .create_purchase(&NewInvoice {
                agency_id: None,
                warehouse_id: wh.id.clone(),
                customer_id: None,
                supplier_id: Some(supplier.id.clone()),
                items: lines(20),
                paid_cents: 0,
                note: None,
                occurred_at: None,
            })
            .await
            .unwrap();
        db.transactions()
            .create_sale(&NewInvoice {
                agency_id: None,
                warehouse_id: wh.id.clone(),
                customer_id: Some(customer.id.clone()),
                supplier_id: None,
                items: lines(3),
                paid_cents: 1_000,
                note: None,
                occurred_at: None,
            })
            .await
            .unwrap();
        db.transactions()
            .create_supply_payment(&NewPayment {
                agency_id: None,
                party_id: supplier.id.clone(),
                amount_cents: 5_000,
                note: None,
                occurred_at: None,
            })
            .await
            .unwrap();
        (db, customer.id)
    }

    #[tokio::test]
    async fn test_sales_and_product_reports() {
        let (db, _) = trading_db().await;
        let sales = db.reports().sales(None, DateRange::default()).await.unwrap();
        assert_eq!(sales.overall.count, 1);
        assert_eq!(sales.overall.total.cents(), 3 * 2_050);
        assert_eq!(sales.by_day.len(), 1);

        let products = db.reports().products(None, DateRange::default()).await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].sku, "FLOUR-50");
        assert_eq!(products[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_debt_and_account_reports() {
        let (db, customer_id) = trading_db().await;
        let debts = db.reports().debts(None).await.unwrap();
        assert_eq!(debts.receivable.cents(), 3 * 2_050 - 1_000);
        assert_eq!(debts.customers[0].party_id, customer_id);
        assert_eq!(debts.payable.cents(), 20 * 1_025 - 5_000);

        let accounts = db.reports().accounts(None, DateRange::default()).await.unwrap();
        assert_eq!(accounts.expense.cents(), 5_000);
        assert_eq!(accounts.net.cents(), -5_000);
    }

    #[tokio::test]
    async fn test_loan_report() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.reports().loans().await.unwrap().is_empty());
        let bank = db
            .banks()
            .create(&NewBank {
                name: "Pashtany".to_string(),
                account_number: None,
                opening_balance_cents: 0,
            })
            .await
            .unwrap();
        db.loans()
            .create(&NewLoan {
                bank_id: bank.id.clone(),
                principal_cents: 12_000,
                interest_rate_bps: 1_000,
                term_months: 12,
                start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            })
            .await
            .unwrap();

        let report = db.reports().loans().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].active_loans, 1);
        assert_eq!(report[0].outstanding.cents(), 13_200);
    }
}
