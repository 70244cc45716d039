//! HTTP routes, one module per area of the back-office.
//!
//! Each module exposes `routes()` and [`crate::build_router`] merges them.
//! Handlers are thin: extract, call one repository method, wrap in JSON.

pub mod accounts;
pub mod banks;
pub mod catalog;
pub mod journal;
pub mod parties;
pub mod reports;
pub mod trading;
pub mod treasury;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tradedesk_core::reports::DateRange;

use crate::error::ApiError;

/// `?agency_id=&from=&to=` shared by the treasury, account and report endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    pub agency_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ScopeQuery {
    pub fn range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange::new(self.from, self.to)?)
    }

    pub fn agency(&self) -> Option<&str> {
        non_empty(&self.agency_id)
    }
}

/// `?agency_id=` alone.
#[derive(Debug, Default, Deserialize)]
pub struct AgencyQuery {
    pub agency_id: Option<String>,
}

impl AgencyQuery {
    pub fn agency(&self) -> Option<&str> {
        non_empty(&self.agency_id)
    }
}

/// Treats `?agency_id=` (empty) the same as an absent parameter.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
