//! Calendar invites for scheduled work orders.
//!
//! [`CalendarEvent`] is a plain record; [`CalendarEvent::to_ics`] is the only
//! place that knows iCalendar syntax. Output uses CRLF line endings, folds
//! content lines at 75 octets, and emits every time in UTC.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::or_na;
use crate::error::{DeskError, Result};
use crate::model::{Claim, ClaimPhoto, Contact, WorkOrderDetail};

const PRODID: &str = "-//claimdesk//work orders//EN";
const MAX_LINE_OCTETS: usize = 75;
const SECTION_RULE: &str = "==============================";

/// A named calendar participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub name: String,
    pub email: String,
}

impl Attendee {
    fn from_contact(contact: &Contact) -> Option<Self> {
        let email = contact.email.as_deref()?.trim();
        (!email.is_empty()).then(|| Self {
            name: contact.name.clone(),
            email: email.to_string(),
        })
    }
}

/// One VEVENT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub uid: String,
    pub stamp: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub organizer: Option<Attendee>,
    pub attendees: Vec<Attendee>,
}

impl CalendarEvent {
    /// Serialize as a complete VCALENDAR document.
    #[must_use]
    pub fn to_ics(&self) -> String {
        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{PRODID}"),
            "BEGIN:VEVENT".to_string(),
            format!("UID:{}", escape_text(&self.uid)),
            format!("DTSTAMP:{}", utc_stamp(self.stamp)),
            format!("DTSTART:{}", utc_stamp(self.start)),
        ];
        lines.extend(self.attendees.iter().map(|a| address_line("ATTENDEE", a)));
        lines.push(format!("DTEND:{}", utc_stamp(self.end)));
        lines.push(format!("SUMMARY:{}", escape_text(&self.summary)));
        lines.push(format!("DESCRIPTION:{}", escape_text(&self.description)));
        if let Some(organizer) = &self.organizer {
            lines.push(address_line("ORGANIZER", organizer));
        }
        lines.push("END:VEVENT".to_string());
        lines.push("END:VCALENDAR".to_string());

        let mut out = String::new();
        for line in &lines {
            out.push_str(&fold(line));
            out.push_str("\r\n");
        }
        out
    }
}

fn utc_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

fn address_line(property: &str, who: &Attendee) -> String {
    format!(
        "{property};CN={}:mailto:{}",
        param_value(&who.name),
        who.email
    )
}

/// Escape a TEXT value.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let normalized = value.replace("\r\n", "\n");
    for c in normalized.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Parameter values may not contain DQUOTE and must be quoted when they
/// hold `:`, `;`, or `,`.
fn param_value(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| *c != '"' && !c.is_control()).collect();
    if cleaned.contains([':', ';', ',']) {
        format!("\"{cleaned}\"")
    } else {
        cleaned
    }
}

/// Fold a content line so no physical line exceeds 75 octets, never
/// splitting a UTF-8 sequence.
fn fold(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > budget {
            out.push_str("\r\n ");
            // Continuation lines spend one octet on the leading space.
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += width;
    }
    out
}

/// Settings taken from configuration when building invites.
#[derive(Debug, Clone)]
pub struct InviteSettings {
    pub time_zone: Tz,
    pub duration_minutes: u32,
    pub public_base_url: String,
    pub organizer: Option<Attendee>,
}

/// Build the invite for a freshly scheduled work order.
///
/// The scheduled date and time are read as wall-clock time in the
/// configured zone.
///
/// # Errors
///
/// Returns a validation error when the work order has no date or time, or
/// when that local time does not exist in the zone.
pub fn workorder_invite(
    claim: &Claim,
    photos: &[ClaimPhoto],
    detail: &WorkOrderDetail,
    settings: &InviteSettings,
    stamp: DateTime<Utc>,
) -> Result<CalendarEvent> {
    let order = &detail.order;
    let (Some(date), Some(time)) = (order.scheduled_date, order.scheduled_time) else {
        return Err(DeskError::validation(
            "scheduled_time",
            "an invite needs both a scheduled date and time",
        ));
    };
    let start = local_to_utc(settings.time_zone, date.and_time(time))?;
    let end = start + Duration::minutes(i64::from(settings.duration_minutes));

    let attendees = [detail.assignee.as_ref(), detail.vendor.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(Attendee::from_contact)
        .collect();

    Ok(CalendarEvent {
        uid: format!("workorder-{}-claim-{}@claimdesk", order.id, claim.id),
        stamp,
        start,
        end,
        summary: format!("Work Order for {}", claim.address),
        description: invite_description(claim, photos, detail, &settings.public_base_url),
        organizer: settings.organizer.clone(),
        attendees,
    })
}

fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| {
            DeskError::validation(
                "scheduled_time",
                format!("{local} does not exist in {}", tz.name()),
            )
        })
}

fn invite_description(
    claim: &Claim,
    photos: &[ClaimPhoto],
    detail: &WorkOrderDetail,
    public_base_url: &str,
) -> String {
    let vendor = detail.vendor.as_ref();
    let assignee = detail.assignee.as_ref();
    let base = public_base_url.trim_end_matches('/');

    let mut text = String::new();
    let _ = writeln!(text, "{SECTION_RULE}");
    let _ = writeln!(text, "CLIENT CONTACT INFORMATION");
    let _ = writeln!(text, "-------------------------");
    let _ = writeln!(text, "Name: {}", or_na(claim.homeowner_name.as_deref()));
    let _ = writeln!(text, "Email: {}", or_na(claim.homeowner_email.as_deref()));
    let _ = writeln!(text, "Phone: {}", or_na(claim.homeowner_phone.as_deref()));
    let _ = writeln!(text, "Cobuyer Name: {}", or_na(claim.cobuyer_name.as_deref()));
    let _ = writeln!(text, "Cobuyer Email: {}", or_na(claim.cobuyer_email.as_deref()));
    let _ = writeln!(text, "Cobuyer Phone: {}", or_na(claim.cobuyer_phone.as_deref()));

    let _ = writeln!(text, "{SECTION_RULE}");
    let _ = writeln!(text, "TRADE OR VENDOR ASSIGNED TO WORK ORDER");
    let _ = writeln!(text, "--------------------------------------");
    let _ = writeln!(text, "Vendor: {}", or_na(vendor.map(|v| v.name.as_str())));
    let _ = writeln!(text, "Vendor Email: {}", or_na(vendor.and_then(|v| v.email.as_deref())));
    let _ = writeln!(text, "Vendor Phone: {}", or_na(vendor.and_then(|v| v.contact_number.as_deref())));
    let _ = writeln!(text, "Assignee: {}", or_na(assignee.map(|a| a.name.as_str())));
    let _ = writeln!(text, "Assignee Email: {}", or_na(assignee.and_then(|a| a.email.as_deref())));
    let _ = writeln!(text, "Assignee Phone: {}", or_na(assignee.and_then(|a| a.contact_number.as_deref())));

    let _ = writeln!(text, "{SECTION_RULE}");
    let _ = writeln!(text, "CLAIM DETAILS");
    let _ = writeln!(text, "-------------");
    let _ = writeln!(text, "Address: {}", claim.address);
    let _ = writeln!(text, "Warranty Type: {}", or_na(claim.warranty_type.as_deref()));
    let _ = writeln!(text, "Issue: {}", or_na(claim.issue_description.as_deref()));
    let _ = writeln!(text, "Notes: {}", or_na(detail.order.notes.as_deref()));
    text.push_str("Photos:\n");
    if photos.is_empty() {
        text.push_str("None attached");
    } else {
        let links: Vec<String> = photos
            .iter()
            .map(|p| format!("{}: {base}/uploads/{}", p.filename, p.filename))
            .collect();
        text.push_str(&links.join("\n"));
    }
    text
}

/// Writes invites to the configured directory as
/// `workorder_claim_{claim_id}.ics`. A newer invite for the same claim
/// replaces the old file.
#[derive(Debug, Clone)]
pub struct InviteWriter {
    dir: PathBuf,
}

impl InviteWriter {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn file_name(claim_id: i64) -> String {
        format!("workorder_claim_{claim_id}.ics")
    }

    #[must_use]
    pub fn path_for(&self, claim_id: i64) -> PathBuf {
        self.dir.join(Self::file_name(claim_id))
    }

    /// # Errors
    ///
    /// Returns a file-write error if the directory or file cannot be written.
    pub fn write(&self, claim_id: i64, event: &CalendarEvent) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|source| DeskError::FileWrite {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(claim_id);
        std::fs::write(&path, event.to_ics()).map_err(|source| DeskError::FileWrite {
            path: path.clone(),
            source,
        })?;
        tracing::info!(claim_id, path = %path.display(), "wrote calendar invite");
        Ok(path)
    }

    /// Latest invite written for a claim.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::FileNotFound`] when no invite exists.
    pub fn read(&self, claim_id: i64) -> Result<String> {
        let path = self.path_for(claim_id);
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                DeskError::FileNotFound(Self::file_name(claim_id))
            } else {
                DeskError::FileWrite { path, source }
            }
        })
    }
}
