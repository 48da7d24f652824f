use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::contact::Contact;

/// Work-order status assigned when the submitter leaves it blank.
pub const DEFAULT_WORK_ORDER_STATUS: &str = "Scheduled";

/// A persisted work-order row.
///
/// `status` is free-form text and never feeds the claim's derived status;
/// only `scheduled_date` does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: i64,
    pub claim_id: i64,
    pub vendor_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub scheduled_date: Option<NaiveDate>,
    #[serde(with = "hhmm")]
    pub scheduled_time: Option<NaiveTime>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at_us: i64,
}

/// A work order with its vendor and assignee resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderDetail {
    #[serde(flatten)]
    pub order: WorkOrder,
    pub vendor: Option<Contact>,
    pub assignee: Option<Contact>,
}

impl WorkOrderDetail {
    #[must_use]
    pub fn vendor_name(&self) -> Option<&str> {
        self.vendor.as_ref().map(|v| v.name.as_str())
    }

    #[must_use]
    pub fn assignee_name(&self) -> Option<&str> {
        self.assignee.as_ref().map(|a| a.name.as_str())
    }
}

/// Serialize scheduled times as `HH:MM`, the form they are submitted in.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => s.serialize_str(&t.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.filter(|s| !s.trim().is_empty())
            .map(|s| NaiveTime::parse_from_str(s.trim(), FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}
