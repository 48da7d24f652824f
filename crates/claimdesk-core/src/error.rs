use std::fmt;
use std::path::PathBuf;

use crate::model::ClaimStatus;

/// Machine-readable error codes surfaced in API responses and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationFailed,
    InvalidEnumValue,
    ReasonRequired,
    ClaimNotFound,
    WorkOrderNotFound,
    FileNotFound,
    InvalidCredentials,
    SessionExpired,
    EmailTaken,
    StorageFailure,
    FileWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ValidationFailed => "E2001",
            Self::InvalidEnumValue => "E2002",
            Self::ReasonRequired => "E2003",
            Self::ClaimNotFound => "E3001",
            Self::WorkOrderNotFound => "E3002",
            Self::FileNotFound => "E3004",
            Self::InvalidCredentials => "E4001",
            Self::SessionExpired => "E4002",
            Self::EmailTaken => "E4003",
            Self::StorageFailure => "E5001",
            Self::FileWriteFailed => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and responses.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ValidationFailed => "Invalid input",
            Self::InvalidEnumValue => "Invalid status value",
            Self::ReasonRequired => "A reason is required for this status",
            Self::ClaimNotFound => "Claim not found",
            Self::WorkOrderNotFound => "Work order not found",
            Self::FileNotFound => "File not found",
            Self::InvalidCredentials => "Invalid credentials",
            Self::SessionExpired => "Not logged in",
            Self::EmailTaken => "Email already registered",
            Self::StorageFailure => "Database operation failed",
            Self::FileWriteFailed => "File write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint surfaced next to the error.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ValidationFailed => None,
            Self::InvalidEnumValue => Some("Use one of: Open, Scheduled, Deferred, Closed."),
            Self::ReasonRequired => {
                Some("Submit the defer or close form with a reason or notes.")
            }
            Self::ClaimNotFound | Self::WorkOrderNotFound | Self::FileNotFound => None,
            Self::InvalidCredentials => Some("Check the email and password and try again."),
            Self::SessionExpired => Some("Log in again."),
            Self::EmailTaken => Some("Log in with the existing account instead."),
            Self::StorageFailure => Some("Retry once. If persistent, check the database file."),
            Self::FileWriteFailed => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors returned by claimdesk-core operations.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    /// A submitted field was missing or malformed. Nothing was written.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// A status value could not be parsed.
    #[error(transparent)]
    InvalidStatus(#[from] crate::model::ParseEnumError),

    /// Moving to `Deferred` or `Closed` needs the dedicated form.
    #[error("changing status to {0} requires a reason")]
    ReasonRequired(ClaimStatus),

    #[error("claim {0} not found")]
    ClaimNotFound(i64),

    #[error("work order {0} not found")]
    WorkOrderNotFound(i64),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session missing or expired")]
    SessionExpired,

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Map this error onto its stable [`ErrorCode`].
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::InvalidStatus(_) => ErrorCode::InvalidEnumValue,
            Self::ReasonRequired(_) => ErrorCode::ReasonRequired,
            Self::ClaimNotFound(_) => ErrorCode::ClaimNotFound,
            Self::WorkOrderNotFound(_) => ErrorCode::WorkOrderNotFound,
            Self::FileNotFound(_) => ErrorCode::FileNotFound,
            Self::InvalidCredentials => ErrorCode::InvalidCredentials,
            Self::SessionExpired => ErrorCode::SessionExpired,
            Self::EmailTaken(_) => ErrorCode::EmailTaken,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::FileWrite { .. } => ErrorCode::FileWriteFailed,
            Self::Internal(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// `true` for lookups that missed (claim, work order, file).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ClaimNotFound(_)
                | Self::WorkOrderNotFound(_)
                | Self::FileNotFound(_)
        )
    }
}

pub type Result<T, E = DeskError> = std::result::Result<T, E>;
