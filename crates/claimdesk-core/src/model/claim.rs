use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{DeskError, Result};

/// The four stored claim states.
///
/// `Deferred` and `Closed` are authoritative; `Open` and `Scheduled` are
/// refined at read time from work-order dates (see [`crate::status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ClaimStatus {
    #[default]
    Open,
    Scheduled,
    Deferred,
    Closed,
}

impl ClaimStatus {
    pub const ALL: [Self; 4] = [Self::Open, Self::Scheduled, Self::Deferred, Self::Closed];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Scheduled => "Scheduled",
            Self::Deferred => "Deferred",
            Self::Closed => "Closed",
        }
    }

    /// Whether entering this state needs a reason/notes payload.
    #[must_use]
    pub const fn requires_reason(self) -> bool {
        matches!(self, Self::Deferred | Self::Closed)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "scheduled" => Ok(Self::Scheduled),
            "deferred" => Ok(Self::Deferred),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "claim status",
                got: s.to_string(),
            }),
        }
    }
}

impl ToSql for ClaimStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ClaimStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

/// A persisted claim row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub address: String,
    pub homeowner_name: Option<String>,
    pub homeowner_email: Option<String>,
    pub homeowner_phone: Option<String>,
    pub cobuyer_name: Option<String>,
    pub cobuyer_email: Option<String>,
    pub cobuyer_phone: Option<String>,
    pub warranty_type: Option<String>,
    pub issue_description: Option<String>,
    pub status: ClaimStatus,
    pub date_reported: NaiveDate,
}

/// Editable claim fields, used both for filing and for updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimDetails {
    pub address: String,
    pub homeowner_name: Option<String>,
    pub homeowner_email: Option<String>,
    pub homeowner_phone: Option<String>,
    pub cobuyer_name: Option<String>,
    pub cobuyer_email: Option<String>,
    pub cobuyer_phone: Option<String>,
    pub warranty_type: Option<String>,
    pub issue_description: Option<String>,
}

impl ClaimDetails {
    /// Trim every field, turn blank optionals into `None`, and require an
    /// address.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the address is blank.
    pub fn normalized(self) -> Result<Self> {
        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(DeskError::validation("address", "address is required"));
        }

        Ok(Self {
            address,
            homeowner_name: blank_to_none(self.homeowner_name),
            homeowner_email: blank_to_none(self.homeowner_email),
            homeowner_phone: blank_to_none(self.homeowner_phone),
            cobuyer_name: blank_to_none(self.cobuyer_name),
            cobuyer_email: blank_to_none(self.cobuyer_email),
            cobuyer_phone: blank_to_none(self.cobuyer_phone),
            warranty_type: blank_to_none(self.warranty_type),
            issue_description: blank_to_none(self.issue_description),
        })
    }
}

/// An uploaded photo attached to a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPhoto {
    pub id: i64,
    pub claim_id: i64,
    pub filename: String,
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
