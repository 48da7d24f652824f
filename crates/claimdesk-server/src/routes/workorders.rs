//! Work-order assignment, invites, printable sheets, and rescheduling.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use claimdesk_core::db::query;
use claimdesk_core::export::{InviteWriter, workorder_sheet};
use claimdesk_core::workflow::{self, AssignmentForm, AssignmentOutcome};
use claimdesk_core::DeskError;
use serde::Deserialize;
use serde_json::json;

use super::Flash;
use crate::app::AppState;
use crate::error::ApiError;
use crate::session::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct DateUpdate {
    pub workorder_id: i64,
    pub new_date: String,
}

pub async fn assign(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(claim_id): Path<i64>,
    Json(form): Json<AssignmentForm>,
) -> Result<(StatusCode, Json<Flash<AssignmentOutcome>>), ApiError> {
    let actor = user.actor();
    let outcome = state
        .with_db(move |conn, state| {
            workflow::assign_work_order(conn, &state.workflow, &actor, claim_id, &form)
        })
        .await?;
    let message = if outcome.invite_path.is_some() {
        "Work order assigned and calendar invite created."
    } else {
        "Work order assigned."
    };
    let warnings = outcome.warnings.clone();
    Ok((
        StatusCode::CREATED,
        Json(Flash::new(message, outcome).with_warnings(warnings)),
    ))
}

/// The most recent calendar invite written for a claim.
pub async fn invite(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(claim_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .with_db(move |conn, state| {
            query::require_claim(conn, claim_id)?;
            state.workflow.invites.read(claim_id)
        })
        .await?;
    Ok((
        [
            (CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", InviteWriter::file_name(claim_id)),
            ),
        ],
        body,
    ))
}

/// A one-page PDF summary of a work order.
pub async fn pdf(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(work_order_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state
        .with_db(move |conn, _| {
            let detail = query::get_work_order_detail(conn, work_order_id)?
                .ok_or(DeskError::WorkOrderNotFound(work_order_id))?;
            let claim = query::require_claim(conn, detail.order.claim_id)?;
            Ok(workorder_sheet(&claim, &detail))
        })
        .await?;
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("inline; filename=\"workorder_{work_order_id}.pdf\""),
            ),
        ],
        bytes,
    ))
}

/// Drag-and-drop reschedule from the calendar. Always answers with a
/// `success` flag so the client can revert the move.
pub async fn update_date(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(update): Json<DateUpdate>,
) -> Response {
    let actor = user.actor();
    let result = state
        .with_db(move |conn, state| {
            workflow::reschedule(
                conn,
                &state.clock,
                &actor,
                update.workorder_id,
                &update.new_date,
            )
        })
        .await;
    match result {
        Ok(entry) => Json(json!({ "success": true, "log": entry })).into_response(),
        Err(error) => {
            let status = error.status();
            let (code, message) = error.code_and_message();
            tracing::debug!(%message, code, "reschedule rejected");
            (
                status,
                Json(json!({ "success": false, "message": message, "code": code })),
            )
                .into_response()
        }
    }
}
