//! Banks, their movements, loans and installment payments.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tradedesk_core::audit::BankCorrection;
use tradedesk_core::input::{BankMovement, NewBank, NewLoan};
use tradedesk_core::{Bank, BankTransaction, Loan, LoanDetail};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/banks", get(list_banks).post(create_bank))
        .route("/banks/reconcile", post(reconcile))
        .route("/banks/:id/deposit", post(deposit))
        .route("/banks/:id/withdraw", post(withdraw))
        .route("/banks/:id/transactions", get(bank_transactions))
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/:id", get(get_loan))
        .route("/installments/:id/pay", post(pay_installment))
}

// =============================================================================
// Banks
// =============================================================================

/// A positive opening balance is recorded as the first deposit.
async fn create_bank(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewBank>,
) -> Result<(StatusCode, Json<Bank>), ApiError> {
    let bank = state.db.banks().create(&input).await?;
    Ok((StatusCode::CREATED, Json(bank)))
}

async fn list_banks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Bank>>, ApiError> {
    Ok(Json(state.db.banks().list().await?))
}

async fn deposit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<BankMovement>,
) -> Result<(StatusCode, Json<BankTransaction>), ApiError> {
    let movement = state.db.banks().deposit(&id, &input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// 409 `INSUFFICIENT_FUNDS` when the amount exceeds the balance.
async fn withdraw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<BankMovement>,
) -> Result<(StatusCode, Json<BankTransaction>), ApiError> {
    let movement = state.db.banks().withdraw(&id, &input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

async fn bank_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<BankTransaction>>, ApiError> {
    Ok(Json(state.db.banks().transactions(&id).await?))
}

async fn reconcile(State(state): State<Arc<AppState>>) -> Result<Json<Vec<BankCorrection>>, ApiError> {
    let corrections = state.db.banks().reconcile().await?;
    if !corrections.is_empty() {
        tracing::info!(count = corrections.len(), "Bank balances reconciled");
    }
    Ok(Json(corrections))
}

// =============================================================================
// Loans
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct LoanQuery {
    bank_id: Option<String>,
}

/// Deposits the principal and stores the full installment schedule.
async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewLoan>,
) -> Result<(StatusCode, Json<LoanDetail>), ApiError> {
    let loan = state.db.loans().create(&input).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanQuery>,
) -> Result<Json<Vec<Loan>>, ApiError> {
    let bank_id = query.bank_id.as_deref().filter(|b| !b.is_empty());
    Ok(Json(state.db.loans().list(bank_id).await?))
}

async fn get_loan(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<LoanDetail>, ApiError> {
    state
        .db
        .loans()
        .get_detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Loan", &id))
}

async fn pay_installment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LoanDetail>, ApiError> {
    Ok(Json(state.db.loans().pay_installment(&id).await?))
}
