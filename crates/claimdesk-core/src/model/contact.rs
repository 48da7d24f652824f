use serde::{Deserialize, Serialize};
use std::fmt;

use super::claim::blank_to_none;
use crate::error::{DeskError, Result};

/// Which contact table a [`Contact`] lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Vendor,
    Assignee,
}

impl ContactKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Assignee => "assignee",
        }
    }

    pub(crate) const fn table(self) -> &'static str {
        match self {
            Self::Vendor => "vendors",
            Self::Assignee => "assignees",
        }
    }
}

impl fmt::Display for ContactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vendor or assignee record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub contact_number: Option<String>,
    pub email: Option<String>,
}

/// Fields accepted when adding a vendor or assignee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewContact {
    pub name: String,
    pub contact_number: Option<String>,
    pub email: Option<String>,
}

impl NewContact {
    /// # Errors
    ///
    /// Returns a validation error when the name is blank.
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DeskError::validation("name", "name is required"));
        }
        Ok(Self {
            name,
            contact_number: blank_to_none(self.contact_number),
            email: blank_to_none(self.email),
        })
    }
}
