//! # Transaction Repository
//!
//! Sales, purchase invoices, returns, collections and supplier payments.
//! Each operation is one database transaction: stock, the transaction row,
//! its items and any EXPENSE record commit together or not at all.
//!
//! ## Invoice Flow (SALE / PURCHASE / RETURN)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate input (kind, lines, party)                                    │
//! │  BEGIN                                                                  │
//! │    warehouse + party must exist                                         │
//! │    for each line:                                                       │
//! │      product must exist, price defaults from product                    │
//! │      stock.adjust(±qty)        SALE fails on insufficient stock         │
//! │    total = Σ qty × price ;  (paid, remaining) = settle(total, paid)     │
//! │    INSERT transaction, INSERT items                                     │
//! │    RETURN with paid > 0  →  INSERT EXPENSE "customer-refund"            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Flow (COLLECTION / SUPPLY_PAYMENT)
//! `total = paid = amount`, `remaining = 0`. A supply payment also writes an
//! EXPENSE "supplier-payment" record, which is how it reaches the treasury.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{account, generate_reference, new_id, party, product, require, stock, warehouse};
use crate::error::DbResult;
use tradedesk_core::input::{NewInvoice, NewPayment};
use tradedesk_core::reports::DateRange;
use tradedesk_core::validation::{invoice_total, line_total, settle};
use tradedesk_core::{
    Transaction, TransactionDetail, TransactionItem, TransactionKind,
    CATEGORY_CUSTOMER_REFUND, CATEGORY_SUPPLIER_PAYMENT,
};

/// Filter for [`TransactionRepository::list`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub agency_id: Option<String>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub range: DateRange,
}

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Sells items out of a warehouse to a customer.
    pub async fn create_sale(&self, input: &NewInvoice) -> DbResult<TransactionDetail> {
        self.create_invoice(TransactionKind::Sale, input).await
    }

    /// Receives items into a warehouse from a supplier.
    pub async fn create_purchase(&self, input: &NewInvoice) -> DbResult<TransactionDetail> {
        self.create_invoice(TransactionKind::Purchase, input).await
    }

    /// Takes items back from a customer. `paid_cents` is refunded in cash,
    /// the rest is credited against the customer's debt.
    pub async fn create_return(&self, input: &NewInvoice) -> DbResult<TransactionDetail> {
        self.create_invoice(TransactionKind::Return, input).await
    }

    async fn create_invoice(&self, kind: TransactionKind, input: &NewInvoice) -> DbResult<TransactionDetail> {
        input.validate(kind)?;

        let now = Utc::now();
        let occurred_at = input.occurred_at.unwrap_or(now);

        let mut tx = self.pool.begin().await?;

        let wh = require(
            warehouse::fetch(&mut tx, &input.warehouse_id).await?,
            "Warehouse",
            &input.warehouse_id,
        )?;
        let mut agency_id = input.agency_id.clone().or(wh.agency_id);
        match kind {
            TransactionKind::Purchase => {
                let supplier_id = input.supplier_id.as_deref().unwrap_or_default();
                let supplier = require(
                    party::fetch_supplier(&mut tx, supplier_id).await?,
                    "Supplier",
                    supplier_id,
                )?;
                agency_id = agency_id.or(supplier.agency_id);
            }
            _ => {
                let customer_id = input.customer_id.as_deref().unwrap_or_default();
                let customer = require(
                    party::fetch_customer(&mut tx, customer_id).await?,
                    "Customer",
                    customer_id,
                )?;
                agency_id = agency_id.or(customer.agency_id);
            }
        }

        let transaction_id = new_id();
        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = require(
                product::fetch(&mut tx, &line.product_id).await?,
                "Product",
                &line.product_id,
            )?;
            let unit_price = line.unit_price_cents.unwrap_or(match kind {
                TransactionKind::Purchase => product.purchase_price_cents,
                _ => product.sale_price_cents,
            });

            stock::adjust(
                &mut tx,
                &product,
                &input.warehouse_id,
                kind.stock_direction() * line.quantity,
                now,
            )
            .await?;

            items.push(TransactionItem {
                id: new_id(),
                transaction_id: transaction_id.clone(),
                product_id: product.id.clone(),
                quantity: line.quantity,
                unit_price_cents: unit_price,
                line_total_cents: line_total(line.quantity, unit_price)?,
            });
        }

        let total = invoice_total(items.iter().map(|i| i.line_total_cents))?;
        let (paid, remaining) = settle(total, input.paid_cents)?;

        let transaction = Transaction {
            id: transaction_id,
            kind,
            agency_id,
            warehouse_id: Some(input.warehouse_id.clone()),
            customer_id: input.customer_id.clone().filter(|_| kind != TransactionKind::Purchase),
            supplier_id: input.supplier_id.clone().filter(|_| kind == TransactionKind::Purchase),
            reference: generate_reference(kind, occurred_at),
            total_cents: total,
            paid_cents: paid,
            remaining_cents: remaining,
            note: input.note.clone(),
            occurred_at,
            created_at: now,
        };

        insert(&mut tx, &transaction).await?;
        for item in &items {
            insert_item(&mut tx, item).await?;
        }

        if kind == TransactionKind::Return && paid > 0 {
            let refund = account::expense_for(
                CATEGORY_CUSTOMER_REFUND,
                paid,
                transaction.agency_id.clone(),
                transaction.customer_id.clone(),
                None,
                format!("Refund for {}", transaction.reference),
                occurred_at,
            );
            account::insert(&mut tx, &refund).await?;
        }

        tx.commit().await?;

        info!(
            reference = %transaction.reference,
            kind = %kind,
            total_cents = total,
            paid_cents = paid,
            lines = items.len(),
            "Transaction recorded"
        );

        Ok(TransactionDetail { transaction, items })
    }

    /// Records cash received from a customer against their debt.
    pub async fn create_collection(&self, input: &NewPayment) -> DbResult<Transaction> {
        self.create_payment(TransactionKind::Collection, input).await
    }

    /// Records cash paid to a supplier against what we owe.
    pub async fn create_supply_payment(&self, input: &NewPayment) -> DbResult<Transaction> {
        self.create_payment(TransactionKind::SupplyPayment, input).await
    }

    async fn create_payment(&self, kind: TransactionKind, input: &NewPayment) -> DbResult<Transaction> {
        input.validate()?;

        let now = Utc::now();
        let occurred_at = input.occurred_at.unwrap_or(now);

        let mut tx = self.pool.begin().await?;

        let (customer_id, supplier_id, party_agency) = match kind {
            TransactionKind::SupplyPayment => {
                let s = require(
                    party::fetch_supplier(&mut tx, &input.party_id).await?,
                    "Supplier",
                    &input.party_id,
                )?;
                (None, Some(s.id), s.agency_id)
            }
            _ => {
                let c = require(
                    party::fetch_customer(&mut tx, &input.party_id).await?,
                    "Customer",
                    &input.party_id,
                )?;
                (Some(c.id), None, c.agency_id)
            }
        };

        let transaction = Transaction {
            id: new_id(),
            kind,
            agency_id: input.agency_id.clone().or(party_agency),
            warehouse_id: None,
            customer_id,
            supplier_id,
            reference: generate_reference(kind, occurred_at),
            total_cents: input.amount_cents,
            paid_cents: input.amount_cents,
            remaining_cents: 0,
            note: input.note.clone(),
            occurred_at,
            created_at: now,
        };
        insert(&mut tx, &transaction).await?;

        if kind == TransactionKind::SupplyPayment {
            let expense = account::expense_for(
                CATEGORY_SUPPLIER_PAYMENT,
                transaction.paid_cents,
                transaction.agency_id.clone(),
                None,
                transaction.supplier_id.clone(),
                format!("Payment {}", transaction.reference),
                occurred_at,
            );
            account::insert(&mut tx, &expense).await?;
        }

        tx.commit().await?;

        info!(
            reference = %transaction.reference,
            kind = %kind,
            amount_cents = transaction.paid_cents,
            "Payment recorded"
        );
        Ok(transaction)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// A transaction with its line items.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<TransactionDetail>> {
        let Some(transaction) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(TransactionDetail { transaction, items }))
    }

    pub async fn items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let rows = sqlx::query_as::<_, TransactionItem>(
            "SELECT * FROM transaction_items WHERE transaction_id = ?1 ORDER BY rowid",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Transactions matching the filter, oldest first.
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        let mut rows = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE (?1 IS NULL OR kind = ?1)
              AND (?2 IS NULL OR agency_id = ?2)
              AND (?3 IS NULL OR customer_id = ?3)
              AND (?4 IS NULL OR supplier_id = ?4)
            ORDER BY occurred_at, id
            "#,
        )
        .bind(filter.kind)
        .bind(&filter.agency_id)
        .bind(&filter.customer_id)
        .bind(&filter.supplier_id)
        .fetch_all(&self.pool)
        .await?;
        rows.retain(|t| filter.range.contains(t.occurred_at));
        Ok(rows)
    }

    /// Items of every transaction, grouped by transaction id.
    pub async fn all_items(&self) -> DbResult<HashMap<String, Vec<TransactionItem>>> {
        let rows = sqlx::query_as::<_, TransactionItem>("SELECT * FROM transaction_items ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        let mut grouped: HashMap<String, Vec<TransactionItem>> = HashMap::new();
        for item in rows {
            grouped.entry(item.transaction_id.clone()).or_default().push(item);
        }
        Ok(grouped)
    }
}

pub(crate) async fn insert(conn: &mut SqliteConnection, t: &Transaction) -> DbResult<()> {
    debug!(id = %t.id, reference = %t.reference, kind = %t.kind, "Inserting transaction");

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, kind, agency_id, warehouse_id, customer_id, supplier_id,
            reference, total_cents, paid_cents, remaining_cents,
            note, occurred_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&t.id)
    .bind(t.kind)
    .bind(&t.agency_id)
    .bind(&t.warehouse_id)
    .bind(&t.customer_id)
    .bind(&t.supplier_id)
    .bind(&t.reference)
    .bind(t.total_cents)
    .bind(t.paid_cents)
    .bind(t.remaining_cents)
    .bind(&t.note)
    .bind(t.occurred_at)
    .bind(t.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, product_id, quantity, unit_price_cents, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.line_total_cents)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use tradedesk_core::input::{LineInput, NewParty, NewProduct, NewWarehouse};
    use tradedesk_core::CoreError;

    struct Fixture {
        db: Database,
        warehouse_id: String,
        product_id: String,
        customer_id: String,
        supplier_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let warehouse_id = db
            .warehouses()
            .create(&NewWarehouse {
                name: "Central".to_string(),
                agency_id: None,
            })
            .await
            .unwrap()
            .id;
        let product_id = db
            .products()
            .create(&NewProduct {
                sku: "SUGAR-1KG".to_string(),
                name: "Sugar 1kg".to_string(),
                unit: "pack".to_string(),
                purchase_price_cents: 80,
                sale_price_cents: 100,
                agency_id: None,
            })
            .await
            .unwrap()
            .id;
        let party = |name: &str| NewParty {
            name: name.to_string(),
            agency_id: None,
            phone: None,
            address: None,
        };
        let customer_id = db.customers().create(&party("Corner Shop")).await.unwrap().id;
        let supplier_id = db.suppliers().create(&party("Sugar Mill")).await.unwrap().id;
        Fixture {
            db,
            warehouse_id,
            product_id,
            customer_id,
            supplier_id,
        }
    }

    fn invoice(f: &Fixture, qty: i64, paid: i64) -> NewInvoice {
        NewInvoice {
            agency_id: None,
            warehouse_id: f.warehouse_id.clone(),
            customer_id: Some(f.customer_id.clone()),
            supplier_id: Some(f.supplier_id.clone()),
            items: vec![LineInput {
                product_id: f.product_id.clone(),
                quantity: qty,
                unit_price_cents: None,
            }],
            paid_cents: paid,
            note: None,
            occurred_at: None,
        }
    }

    fn payment(party_id: &str, amount: i64) -> NewPayment {
        NewPayment {
            agency_id: None,
            party_id: party_id.to_string(),
            amount_cents: amount,
            note: None,
            occurred_at: None,
        }
    }

    #[tokio::test]
    async fn test_purchase_then_sale_moves_stock() {
        let f = fixture().await;
        let purchase = f.db.transactions().create_purchase(&invoice(&f, 10, 800)).await.unwrap();
        assert_eq!(purchase.transaction.total_cents, 800);
        assert_eq!(purchase.transaction.customer_id, None);
        assert!(purchase.transaction.reference.starts_with("PUR-"));

        let sale = f.db.transactions().create_sale(&invoice(&f, 4, 150)).await.unwrap();
        assert_eq!(sale.transaction.total_cents, 400);
        assert_eq!(sale.transaction.paid_cents, 150);
        assert_eq!(sale.transaction.remaining_cents, 250);
        assert_eq!(sale.items.len(), 1);
        assert_eq!(
            f.db.stock().quantity(&f.product_id, &f.warehouse_id).await.unwrap(),
            6
        );

        let detail = f.db.transactions().get_detail(&sale.transaction.id).await.unwrap().unwrap();
        assert_eq!(detail.items[0].line_total_cents, 400);
    }

    #[tokio::test]
    async fn test_sale_without_stock_leaves_nothing_behind() {
        let f = fixture().await;
        let err = f.db.transactions().create_sale(&invoice(&f, 1, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
        assert!(f.db.transactions().list(&TransactionFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overpaid_invoice_rejected() {
        let f = fixture().await;
        let err = f.db.transactions().create_purchase(&invoice(&f, 1, 81)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidAmounts { .. })));
        assert_eq!(
            f.db.stock().quantity(&f.product_id, &f.warehouse_id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_invoice_total_overflow_rejected() {
        let f = fixture().await;
        let line = |qty: i64| LineInput {
            product_id: f.product_id.clone(),
            quantity: qty,
            unit_price_cents: Some(tradedesk_core::MAX_AMOUNT_CENTS),
        };

        let mut single = invoice(&f, 1, 0);
        single.items = vec![line(tradedesk_core::MAX_LINE_QUANTITY)];
        let err = f.db.transactions().create_purchase(&single).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidAmounts { .. })));

        let mut split = invoice(&f, 1, 0);
        split.items = vec![line(500_000), line(500_000)];
        let err = f.db.transactions().create_purchase(&split).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidAmounts { .. })));

        assert!(f.db.transactions().list(&TransactionFilter::default()).await.unwrap().is_empty());
        assert_eq!(
            f.db.stock().quantity(&f.product_id, &f.warehouse_id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_return_refund_becomes_expense() {
        let f = fixture().await;
        f.db.transactions().create_purchase(&invoice(&f, 5, 0)).await.unwrap();
        f.db.transactions().create_sale(&invoice(&f, 2, 200)).await.unwrap();

        let ret = f.db.transactions().create_return(&invoice(&f, 1, 60)).await.unwrap();
        assert_eq!(ret.transaction.remaining_cents, 40);
        assert_eq!(
            f.db.stock().quantity(&f.product_id, &f.warehouse_id).await.unwrap(),
            4
        );

        let records = f.db.accounts().list(&Default::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, CATEGORY_CUSTOMER_REFUND);
        assert_eq!(records[0].amount_cents, 60);
        assert_eq!(records[0].customer_id.as_deref(), Some(f.customer_id.as_str()));
    }

    #[tokio::test]
    async fn test_payments() {
        let f = fixture().await;
        let collection = f
            .db
            .transactions()
            .create_collection(&payment(&f.customer_id, 500))
            .await
            .unwrap();
        assert_eq!(collection.total_cents, 500);
        assert_eq!(collection.remaining_cents, 0);
        assert!(f.db.accounts().list(&Default::default()).await.unwrap().is_empty());

        let paid = f
            .db
            .transactions()
            .create_supply_payment(&payment(&f.supplier_id, 300))
            .await
            .unwrap();
        assert_eq!(paid.kind, TransactionKind::SupplyPayment);
        let records = f.db.accounts().list(&Default::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, CATEGORY_SUPPLIER_PAYMENT);
        assert_eq!(records[0].supplier_id.as_deref(), Some(f.supplier_id.as_str()));

        let collections = f
            .db
            .transactions()
            .list(&TransactionFilter {
                kind: Some(TransactionKind::Collection),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(collections.len(), 1);
    }

    #[tokio::test]
    async fn test_payment_to_unknown_party() {
        let f = fixture().await;
        let err = f
            .db
            .transactions()
            .create_collection(&payment(&f.supplier_id, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
