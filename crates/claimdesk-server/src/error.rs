//! Mapping from library errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use claimdesk_core::DeskError;
use serde::Serialize;

/// A [`DeskError`] on its way out as JSON.
#[derive(Debug)]
pub struct ApiError(pub DeskError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            DeskError::Validation { .. } | DeskError::InvalidStatus(_) | DeskError::ReasonRequired(_) => {
                StatusCode::BAD_REQUEST
            }
            DeskError::ClaimNotFound(_)
            | DeskError::WorkOrderNotFound(_)
            | DeskError::FileNotFound(_) => StatusCode::NOT_FOUND,
            DeskError::InvalidCredentials | DeskError::SessionExpired => StatusCode::UNAUTHORIZED,
            DeskError::EmailTaken(_) => StatusCode::CONFLICT,
            DeskError::Storage(_) | DeskError::FileWrite { .. } | DeskError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable error code and message, for bodies that are not [`ErrorBody`].
    #[must_use]
    pub fn code_and_message(&self) -> (&'static str, String) {
        (self.0.code().code(), self.0.to_string())
    }
}

impl From<DeskError> for ApiError {
    fn from(error: DeskError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = %self.0.code(), "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        let code = self.0.code();
        let body = ErrorBody {
            error: self.0.to_string(),
            code: code.code(),
            hint: code.hint(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimdesk_core::model::ClaimStatus;

    #[test]
    fn categories_map_to_statuses() {
        let cases = [
            (DeskError::validation("address", "required"), StatusCode::BAD_REQUEST),
            (DeskError::ReasonRequired(ClaimStatus::Closed), StatusCode::BAD_REQUEST),
            (DeskError::ClaimNotFound(1), StatusCode::NOT_FOUND),
            (DeskError::FileNotFound("x".to_string()), StatusCode::NOT_FOUND),
            (DeskError::SessionExpired, StatusCode::UNAUTHORIZED),
            (DeskError::EmailTaken("a@b".to_string()), StatusCode::CONFLICT),
            (DeskError::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }
}
