//! Claim filing, viewing, editing, status transitions, and deletion.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use claimdesk_core::db::query;
use claimdesk_core::lifecycle::{
    self, ClosureForm, DeletionReport, FiledClaim, PhotoUpload, TransitionOutcome,
};
use claimdesk_core::model::{
    Claim, ClaimClosure, ClaimDetails, ClaimLog, ClaimPhoto, ClaimStatus, WorkOrderDetail,
};
use claimdesk_core::status::{self, Assignment, Dashboard};
use claimdesk_core::{audit, DeskError};
use serde::{Deserialize, Serialize};

use super::Flash;
use crate::app::AppState;
use crate::error::ApiError;
use crate::session::CurrentUser;

/// Everything the claim detail page shows.
#[derive(Debug, Serialize)]
pub struct ClaimView {
    pub claim: Claim,
    pub effective_status: ClaimStatus,
    pub assignment: Assignment,
    pub scheduled_display: String,
    pub work_orders: Vec<WorkOrderDetail>,
    pub photos: Vec<ClaimPhoto>,
    pub closure: Option<ClaimClosure>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeferForm {
    pub reason: String,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = state
        .with_db(|conn, state| status::load_dashboard(conn, state.clock.today()))
        .await?;
    Ok(Json(dashboard))
}

fn multipart_error(error: &axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(DeskError::validation("form", error.to_string()))
}

fn set_detail(details: &mut ClaimDetails, name: &str, value: String) {
    let slot = match name {
        "address" => {
            details.address = value;
            return;
        }
        "homeowner_name" => &mut details.homeowner_name,
        "homeowner_email" => &mut details.homeowner_email,
        "homeowner_phone" => &mut details.homeowner_phone,
        "cobuyer_name" => &mut details.cobuyer_name,
        "cobuyer_email" => &mut details.cobuyer_email,
        "cobuyer_phone" => &mut details.cobuyer_phone,
        "warranty_type" => &mut details.warranty_type,
        "issue_description" => &mut details.issue_description,
        _ => return,
    };
    *slot = Some(value);
}

/// File a claim from a multipart form. Files come in as `photos` fields;
/// parts with an empty filename are ignored. A photo with an unusable name
/// rejects the whole filing.
pub async fn create_claim(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Flash<FiledClaim>>), ApiError> {
    let mut details = ClaimDetails::default();
    let mut photos = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "photos" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
            if !file_name.is_empty() {
                photos.push(PhotoUpload {
                    original_name: file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field.text().await.map_err(|e| multipart_error(&e))?;
            set_detail(&mut details, &name, value);
        }
    }

    let filed = state
        .with_db(move |conn, state| {
            lifecycle::file_claim(conn, &state.clock, &state.uploads, details, &photos)
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Flash::new("Claim added successfully.", filed)),
    ))
}

pub async fn get_claim(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(claim_id): Path<i64>,
) -> Result<Json<ClaimView>, ApiError> {
    let view = state
        .with_db(move |conn, state| {
            let claim = query::require_claim(conn, claim_id)?;
            let work_orders = query::work_order_details_for_claim(conn, claim_id)?;
            let photos = query::list_photos(conn, claim_id)?;
            let closure = query::latest_closure(conn, claim_id)?;
            let summary = status::summarize(claim, &work_orders, state.clock.today());
            Ok(ClaimView {
                claim: summary.claim,
                effective_status: summary.effective_status,
                assignment: summary.assignment,
                scheduled_display: summary.scheduled_display,
                work_orders,
                photos,
                closure,
            })
        })
        .await?;
    Ok(Json(view))
}

pub async fn update_claim(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(claim_id): Path<i64>,
    Json(details): Json<ClaimDetails>,
) -> Result<Json<Flash<Claim>>, ApiError> {
    let details = details.normalized()?;
    let claim = state
        .with_db(move |conn, _| query::update_claim_details(conn, claim_id, &details))
        .await?;
    tracing::info!(claim_id, "claim details updated");
    Ok(Json(Flash::new("Claim updated successfully.", claim)))
}

pub async fn delete_claim(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(claim_id): Path<i64>,
) -> Result<Json<Flash<DeletionReport>>, ApiError> {
    let report = state
        .with_db(move |conn, state| lifecycle::delete_claim(conn, &state.uploads, claim_id))
        .await?;
    let warnings = report.warnings.clone();
    Ok(Json(
        Flash::new("Claim deleted successfully.", report).with_warnings(warnings),
    ))
}

fn transition_message(outcome: &TransitionOutcome, claim_id: i64) -> String {
    match outcome {
        TransitionOutcome::Unchanged { status } => format!("Claim is already {status}."),
        TransitionOutcome::Applied { to, .. } => match to {
            ClaimStatus::Deferred => "Claim deferred and action logged.".to_string(),
            ClaimStatus::Closed => "Claim closed and action logged.".to_string(),
            _ => "Claim status updated and action logged.".to_string(),
        },
        TransitionOutcome::ReasonRequired { to } => {
            let route = if *to == ClaimStatus::Closed { "close" } else { "defer" };
            format!("A reason is required. Submit it to /claims/{claim_id}/{route}.")
        }
    }
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(claim_id): Path<i64>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Flash<TransitionOutcome>>, ApiError> {
    let new_status: ClaimStatus = form.status.parse().map_err(DeskError::from)?;
    let actor = user.actor();
    let outcome = state
        .with_db(move |conn, state| {
            lifecycle::change_status(conn, &state.clock, &actor, claim_id, new_status)
        })
        .await?;
    Ok(Json(Flash::new(transition_message(&outcome, claim_id), outcome)))
}

pub async fn defer_claim(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(claim_id): Path<i64>,
    Json(form): Json<DeferForm>,
) -> Result<Json<Flash<TransitionOutcome>>, ApiError> {
    let actor = user.actor();
    let outcome = state
        .with_db(move |conn, state| {
            lifecycle::defer_claim(conn, &state.clock, &actor, claim_id, &form.reason)
        })
        .await?;
    Ok(Json(Flash::new(transition_message(&outcome, claim_id), outcome)))
}

pub async fn close_claim(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(claim_id): Path<i64>,
    Json(form): Json<ClosureForm>,
) -> Result<Json<Flash<TransitionOutcome>>, ApiError> {
    let actor = user.actor();
    let outcome = state
        .with_db(move |conn, state| {
            lifecycle::close_claim(conn, &state.clock, &actor, claim_id, &form)
        })
        .await?;
    Ok(Json(Flash::new(transition_message(&outcome, claim_id), outcome)))
}

pub async fn claim_log(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(claim_id): Path<i64>,
) -> Result<Json<Vec<ClaimLog>>, ApiError> {
    let entries = state
        .with_db(move |conn, _| {
            query::require_claim(conn, claim_id)?;
            audit::entries_for_claim(conn, claim_id)
        })
        .await?;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_fields_fill_matching_details() {
        let mut details = ClaimDetails::default();
        set_detail(&mut details, "address", "12 Elm St".to_string());
        set_detail(&mut details, "homeowner_name", "Pat".to_string());
        set_detail(&mut details, "unknown", "ignored".to_string());
        assert_eq!(details.address, "12 Elm St");
        assert_eq!(details.homeowner_name.as_deref(), Some("Pat"));
        assert_eq!(details.cobuyer_name, None);
    }

    #[test]
    fn reason_required_points_at_the_right_route() {
        let close = TransitionOutcome::ReasonRequired {
            to: ClaimStatus::Closed,
        };
        assert!(transition_message(&close, 4).contains("/claims/4/close"));
        let defer = TransitionOutcome::ReasonRequired {
            to: ClaimStatus::Deferred,
        };
        assert!(transition_message(&defer, 4).contains("/claims/4/defer"));
    }
}
