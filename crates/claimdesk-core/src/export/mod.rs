//! Documents generated from work orders.
//!
//! - [`ical`]: an RFC 5545 calendar invite per assignment
//! - [`pdf`]: a one-page printable work-order sheet

pub mod ical;
pub mod pdf;

pub use ical::{Attendee, CalendarEvent, InviteSettings, InviteWriter, workorder_invite};
pub use pdf::workorder_sheet;

/// Placeholder used in documents for absent values.
pub(crate) const NOT_AVAILABLE: &str = "N/A";

pub(crate) fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}
