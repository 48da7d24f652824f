use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One immutable audit-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLog {
    pub id: i64,
    pub claim_id: i64,
    pub user_id: i64,
    /// Acting user's display name at read time.
    pub user_name: String,
    /// Wall-clock time in the configured zone, offset included.
    pub timestamp: DateTime<FixedOffset>,
    pub action: String,
}

/// The record written when a claim is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimClosure {
    pub id: i64,
    pub claim_id: i64,
    pub reasons: Option<String>,
    pub notes: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
}
