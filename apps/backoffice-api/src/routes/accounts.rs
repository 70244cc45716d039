//! Manual income and expense records.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tradedesk_core::input::NewAccountRecord;
use tradedesk_core::reports::DateRange;
use tradedesk_core::{AccountRecord, AccountRecordKind};
use tradedesk_db::AccountFilter;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/account-records", get(list_records).post(create_record))
}

async fn create_record(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewAccountRecord>,
) -> Result<(StatusCode, Json<AccountRecord>), ApiError> {
    let record = state.db.accounts().create(&input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Default, Deserialize)]
struct RecordQuery {
    kind: Option<AccountRecordKind>,
    agency_id: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<AccountRecord>>, ApiError> {
    let filter = AccountFilter {
        kind: query.kind,
        agency_id: query.agency_id.filter(|a| !a.trim().is_empty()),
        range: DateRange::new(query.from, query.to)?,
    };
    Ok(Json(state.db.accounts().list(&filter).await?))
}
