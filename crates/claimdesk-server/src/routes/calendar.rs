use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Datelike;
use claimdesk_core::calendar::{self, MonthView};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::session::CurrentUser;

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Month grid of scheduled, non-closed work orders. Defaults to the
/// current month in the configured zone.
pub async fn month(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthView>, ApiError> {
    let today = state.clock.today();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());
    let view = state
        .with_db(move |conn, _| calendar::month_view(conn, year, month))
        .await?;
    Ok(Json(view))
}
