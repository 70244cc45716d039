//! Read-only aggregations for the dashboard.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tradedesk_core::reports::{AccountSummary, BankLoanExposure, DebtReport, ProductSales, SalesReport};

use super::{AgencyQuery, ScopeQuery};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports/sales", get(sales))
        .route("/reports/accounts", get(accounts))
        .route("/reports/products", get(products))
        .route("/reports/debts", get(debts))
        .route("/reports/loans", get(loans))
}

async fn sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<SalesReport>, ApiError> {
    let range = query.range()?;
    Ok(Json(state.db.reports().sales(query.agency(), range).await?))
}

async fn accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<AccountSummary>, ApiError> {
    let range = query.range()?;
    Ok(Json(state.db.reports().accounts(query.agency(), range).await?))
}

/// Best sellers first.
async fn products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<ProductSales>>, ApiError> {
    let range = query.range()?;
    Ok(Json(state.db.reports().products(query.agency(), range).await?))
}

async fn debts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgencyQuery>,
) -> Result<Json<DebtReport>, ApiError> {
    Ok(Json(state.db.reports().debts(query.agency()).await?))
}

async fn loans(State(state): State<Arc<AppState>>) -> Result<Json<Vec<BankLoanExposure>>, ApiError> {
    Ok(Json(state.db.reports().loans().await?))
}
