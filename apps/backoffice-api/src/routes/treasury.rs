//! Cash position, general or per agency.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tradedesk_core::treasury::{PeriodLedger, TreasurySummary};
use tradedesk_core::TreasuryScope;

use super::ScopeQuery;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/treasury", get(summary))
        .route("/treasury/ledger", get(ledger))
}

fn scope(query: &ScopeQuery) -> TreasuryScope {
    TreasuryScope::from_agency(query.agency().map(str::to_string))
}

/// `GET /treasury?agency_id=&from=&to=`
async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<TreasurySummary>, ApiError> {
    let range = query.range()?;
    Ok(Json(state.db.treasury().summary(scope(&query), range).await?))
}

async fn ledger(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<PeriodLedger>, ApiError> {
    let range = query.range()?;
    Ok(Json(state.db.treasury().ledger(scope(&query), range).await?))
}
