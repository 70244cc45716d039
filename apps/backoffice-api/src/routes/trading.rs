//! Sales, purchases, returns, collections and supply payments.
//!
//! Every write goes through one repository call that updates stock, debt
//! and the cash-side records inside a single database transaction.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tradedesk_core::input::{NewInvoice, NewPayment};
use tradedesk_core::reports::DateRange;
use tradedesk_core::{Transaction, TransactionDetail, TransactionKind};
use tradedesk_db::TransactionFilter;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sales", post(create_sale))
        .route("/purchases", post(create_purchase))
        .route("/returns", post(create_return))
        .route("/collections", post(create_collection))
        .route("/supply-payments", post(create_supply_payment))
        .route("/transactions", get(list_transactions))
        .route("/transactions/:id", get(get_transaction))
}

type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

async fn create_sale(State(state): State<Arc<AppState>>, Json(input): Json<NewInvoice>) -> Created<TransactionDetail> {
    let detail = state.db.transactions().create_sale(&input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewInvoice>,
) -> Created<TransactionDetail> {
    let detail = state.db.transactions().create_purchase(&input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn create_return(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewInvoice>,
) -> Created<TransactionDetail> {
    let detail = state.db.transactions().create_return(&input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn create_collection(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewPayment>,
) -> Created<Transaction> {
    let transaction = state.db.transactions().create_collection(&input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn create_supply_payment(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewPayment>,
) -> Created<Transaction> {
    let transaction = state.db.transactions().create_supply_payment(&input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

#[derive(Debug, Default, Deserialize)]
struct TransactionQuery {
    kind: Option<TransactionKind>,
    agency_id: Option<String>,
    customer_id: Option<String>,
    supplier_id: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionQuery> for TransactionFilter {
    type Error = ApiError;

    fn try_from(query: TransactionQuery) -> Result<Self, Self::Error> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(TransactionFilter {
            kind: query.kind,
            agency_id: present(query.agency_id),
            customer_id: present(query.customer_id),
            supplier_id: present(query.supplier_id),
            range: DateRange::new(query.from, query.to)?,
        })
    }
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let filter = TransactionFilter::try_from(query)?;
    Ok(Json(state.db.transactions().list(&filter).await?))
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionDetail>, ApiError> {
    state
        .db
        .transactions()
        .get_detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Transaction", &id))
}
