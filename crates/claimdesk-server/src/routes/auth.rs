//! Registration, login, and logout.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use claimdesk_core::auth::{self, Registration};
use claimdesk_core::model::User;
use serde::Deserialize;

use super::Flash;
use crate::app::AppState;
use crate::error::ApiError;
use crate::session::{expired_cookie, session_cookie, session_token};

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<Flash<User>>), ApiError> {
    let user = state
        .with_db(move |conn, state| auth::register(conn, &state.clock, &form))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Flash::new("Registration successful. Please log in.", user)),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(form): Json<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .with_db(move |conn, state| {
            let user = auth::verify_credentials(conn, &form.email, &form.password)?;
            let token = auth::create_session(conn, &state.clock, user.id)?;
            Ok((user, token))
        })
        .await?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok((
        [(SET_COOKIE, session_cookie(&token))],
        Json(Flash::new("Logged in.", user)),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token(&headers) {
        state
            .with_db(move |conn, _| auth::end_session(conn, &token))
            .await?;
    }
    Ok((
        [(SET_COOKIE, expired_cookie())],
        Json(Flash::new("Logged out.", ())),
    ))
}
