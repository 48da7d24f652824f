//! Vendors and assignees share one handler pair, split by [`ContactKind`].

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use claimdesk_core::db::query;
use claimdesk_core::model::{Contact, ContactKind, NewContact};

use super::Flash;
use crate::app::AppState;
use crate::error::ApiError;
use crate::session::CurrentUser;

async fn list(state: &Arc<AppState>, kind: ContactKind) -> Result<Json<Vec<Contact>>, ApiError> {
    let contacts = state
        .with_db(move |conn, _| query::list_contacts(conn, kind))
        .await?;
    Ok(Json(contacts))
}

async fn create(
    state: &Arc<AppState>,
    kind: ContactKind,
    contact: NewContact,
) -> Result<(StatusCode, Json<Flash<Contact>>), ApiError> {
    let contact = contact.normalized()?;
    let created = state
        .with_db(move |conn, _| query::insert_contact(conn, kind, &contact))
        .await?;
    tracing::info!(kind = kind.as_str(), id = created.id, "contact added");
    let message = match kind {
        ContactKind::Vendor => "Vendor added successfully.",
        ContactKind::Assignee => "Assignee added successfully.",
    };
    Ok((StatusCode::CREATED, Json(Flash::new(message, created))))
}

pub async fn list_vendors(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<Vec<Contact>>, ApiError> {
    list(&state, ContactKind::Vendor).await
}

pub async fn create_vendor(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Json(contact): Json<NewContact>,
) -> Result<(StatusCode, Json<Flash<Contact>>), ApiError> {
    create(&state, ContactKind::Vendor, contact).await
}

pub async fn list_assignees(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<Vec<Contact>>, ApiError> {
    list(&state, ContactKind::Assignee).await
}

pub async fn create_assignee(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Json(contact): Json<NewContact>,
) -> Result<(StatusCode, Json<Flash<Contact>>), ApiError> {
    create(&state, ContactKind::Assignee, contact).await
}
