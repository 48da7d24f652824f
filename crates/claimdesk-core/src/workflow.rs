//! Work-order assignment and rescheduling.
//!
//! Assignment runs in three phases:
//!
//! 1. parse the submitted form; nothing is touched if a value is malformed
//! 2. one transaction inserts the work order, marks the claim `Scheduled`,
//!    and writes the audit entries
//! 3. after commit, the calendar invite is written; a failure there is
//!    returned as a warning and never undoes phase 2

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::clock::LocalClock;
use crate::config::{DeskConfig, ReferencePolicy, ServerConfig};
use crate::db::query::{self, NewWorkOrder};
use crate::error::{DeskError, Result};
use crate::export::{Attendee, InviteSettings, InviteWriter, workorder_invite};
use crate::model::{
    Actor, Claim, ClaimLog, ClaimStatus, Contact, ContactKind, DEFAULT_WORK_ORDER_STATUS, WorkOrder,
    WorkOrderDetail,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_ORGANIZER_NAME: &str = "Claims Desk";
const TIME_FORMAT: &str = "%H:%M";

/// Everything the workflows need from configuration.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub clock: LocalClock,
    pub reference_policy: ReferencePolicy,
    pub invite_settings: InviteSettings,
    pub invites: InviteWriter,
}

impl WorkflowContext {
    #[must_use]
    pub fn from_config(config: &DeskConfig) -> Self {
        Self::with_clock(config, config.clock())
    }

    /// Same as [`WorkflowContext::from_config`] with an explicit clock.
    #[must_use]
    pub fn with_clock(config: &DeskConfig, clock: LocalClock) -> Self {
        Self {
            clock,
            reference_policy: config.workflow.reference_policy,
            invite_settings: InviteSettings {
                time_zone: config.schedule.time_zone,
                duration_minutes: config.schedule.invite_duration_minutes,
                public_base_url: config.server.public_base_url.clone(),
                organizer: organizer(&config.server),
            },
            invites: InviteWriter::new(config.storage.invite_dir.clone()),
        }
    }
}

fn organizer(server: &ServerConfig) -> Option<Attendee> {
    let email = non_blank(server.organizer_email.as_deref())?;
    let name = non_blank(server.organizer_name.as_deref()).unwrap_or(DEFAULT_ORGANIZER_NAME);
    Some(Attendee {
        name: name.to_string(),
        email: email.to_string(),
    })
}

/// Raw assignment submission. Every field is optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentForm {
    pub vendor_id: Option<String>,
    pub assignee_id: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedAssignment {
    vendor_id: Option<i64>,
    assignee_id: Option<i64>,
    scheduled_date: Option<NaiveDate>,
    scheduled_time: Option<NaiveTime>,
    status: String,
    notes: Option<String>,
}

impl AssignmentForm {
    fn parse(&self) -> Result<ParsedAssignment> {
        Ok(ParsedAssignment {
            vendor_id: parse_id("vendor_id", self.vendor_id.as_deref())?,
            assignee_id: parse_id("assignee_id", self.assignee_id.as_deref())?,
            scheduled_date: parse_date("scheduled_date", self.scheduled_date.as_deref())?,
            scheduled_time: parse_time("scheduled_time", self.scheduled_time.as_deref())?,
            status: non_blank(self.status.as_deref())
                .unwrap_or(DEFAULT_WORK_ORDER_STATUS)
                .to_string(),
            notes: non_blank(self.notes.as_deref()).map(str::to_string),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(field: &'static str, raw: Option<&str>) -> Result<Option<i64>> {
    non_blank(raw)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| DeskError::validation(field, format!("'{v}' is not a valid id")))
        })
        .transpose()
}

/// Parse an optional `YYYY-MM-DD` value; blank means absent.
///
/// # Errors
///
/// Returns a validation error naming `field` for malformed input.
pub fn parse_date(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    non_blank(raw)
        .map(|v| {
            NaiveDate::parse_from_str(v, DATE_FORMAT).map_err(|_| {
                DeskError::validation(field, format!("'{v}' is not a date in YYYY-MM-DD form"))
            })
        })
        .transpose()
}

fn parse_time(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveTime>> {
    non_blank(raw)
        .map(|v| {
            NaiveTime::parse_from_str(v, TIME_FORMAT).map_err(|_| {
                DeskError::validation(field, format!("'{v}' is not a time in HH:MM form"))
            })
        })
        .transpose()
}

fn resolve_contact(
    conn: &Connection,
    policy: ReferencePolicy,
    kind: ContactKind,
    id: Option<i64>,
) -> Result<Option<Contact>> {
    let Some(id) = id else {
        return Ok(None);
    };
    match (query::get_contact(conn, kind, id)?, policy) {
        (Some(contact), _) => Ok(Some(contact)),
        (None, ReferencePolicy::Strict) => {
            let field = match kind {
                ContactKind::Vendor => "vendor_id",
                ContactKind::Assignee => "assignee_id",
            };
            Err(DeskError::validation(field, format!("no {kind} with id {id}")))
        }
        (None, ReferencePolicy::Lenient) => {
            tracing::warn!(kind = kind.as_str(), id, "unknown reference stored as unassigned");
            Ok(None)
        }
    }
}

/// What an assignment produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentOutcome {
    pub work_order: WorkOrder,
    pub log_entries: Vec<ClaimLog>,
    pub invite_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

fn assignment_log(detail: &WorkOrderDetail, actor: &Actor) -> String {
    let order = &detail.order;
    let date = order
        .scheduled_date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    let time = order
        .scheduled_time
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default();
    format!(
        "Work order assigned or changed: Vendor: {}, Assignee: {}, Scheduled: {date} {time}, \
         Status: {}, Notes: {} by {}",
        detail.vendor_name().unwrap_or("N/A"),
        detail.assignee_name().unwrap_or("N/A"),
        order.status,
        order.notes.as_deref().unwrap_or("N/A"),
        actor.name,
    )
}

fn first_assignment_log(detail: &WorkOrderDetail, actor: &Actor) -> String {
    let mut parts = Vec::new();
    if let Some(name) = detail.assignee_name() {
        parts.push(format!("Assignee: {name}"));
    }
    if let Some(name) = detail.vendor_name() {
        parts.push(format!("Vendor: {name}"));
    }
    let target = if parts.is_empty() {
        "Unassigned".to_string()
    } else {
        parts.join(" and ")
    };
    format!("Claim first assigned to {target} by {}", actor.name)
}

/// Create a work order for a claim.
///
/// The claim's stored status becomes `Scheduled` whatever the date, and an
/// audit entry is written; the claim's first work order also gets a
/// "first assigned" entry.
///
/// # Errors
///
/// Returns a validation error for malformed input (or an unknown contact
/// under the strict reference policy), [`DeskError::ClaimNotFound`] for a
/// missing claim, or a storage error. Invite failures are not errors.
pub fn assign_work_order(
    conn: &mut Connection,
    ctx: &WorkflowContext,
    actor: &Actor,
    claim_id: i64,
    form: &AssignmentForm,
) -> Result<AssignmentOutcome> {
    let parsed = form.parse()?;

    let tx = conn.transaction()?;
    let claim = query::require_claim(&tx, claim_id)?;
    let vendor = resolve_contact(&tx, ctx.reference_policy, ContactKind::Vendor, parsed.vendor_id)?;
    let assignee = resolve_contact(
        &tx,
        ctx.reference_policy,
        ContactKind::Assignee,
        parsed.assignee_id,
    )?;

    let work_order = query::insert_work_order(
        &tx,
        &NewWorkOrder {
            claim_id,
            vendor_id: vendor.as_ref().map(|v| v.id),
            assignee_id: assignee.as_ref().map(|a| a.id),
            scheduled_date: parsed.scheduled_date,
            scheduled_time: parsed.scheduled_time,
            status: parsed.status,
            notes: parsed.notes,
            created_at_us: ctx.clock.now_us(),
        },
    )?;
    query::set_claim_status(&tx, claim_id, ClaimStatus::Scheduled)?;

    let detail = WorkOrderDetail {
        order: work_order.clone(),
        vendor,
        assignee,
    };
    let mut log_entries = vec![audit::record(
        &tx,
        &ctx.clock,
        claim_id,
        actor.user_id,
        &assignment_log(&detail, actor),
    )?];
    if query::count_work_orders(&tx, claim_id)? == 1 {
        log_entries.push(audit::record(
            &tx,
            &ctx.clock,
            claim_id,
            actor.user_id,
            &first_assignment_log(&detail, actor),
        )?);
    }
    tx.commit()?;
    tracing::info!(claim_id, work_order_id = work_order.id, "work order assigned");

    let mut warnings = Vec::new();
    let invite_path = match write_invite(conn, ctx, &claim, &detail) {
        Ok(path) => Some(path),
        Err(error) => {
            tracing::warn!(claim_id, %error, "calendar invite not written");
            warnings.push(format!("Failed to generate calendar invite: {error}"));
            None
        }
    };

    Ok(AssignmentOutcome {
        work_order,
        log_entries,
        invite_path,
        warnings,
    })
}

fn write_invite(
    conn: &Connection,
    ctx: &WorkflowContext,
    claim: &Claim,
    detail: &WorkOrderDetail,
) -> Result<PathBuf> {
    let photos = query::list_photos(conn, claim.id)?;
    let event = workorder_invite(claim, &photos, detail, &ctx.invite_settings, ctx.clock.now_utc())?;
    ctx.invites.write(claim.id, &event)
}

/// Move a work order to a new date and log it. The claim's stored status
/// is left alone.
///
/// # Errors
///
/// Returns a validation error for a blank or malformed date,
/// [`DeskError::WorkOrderNotFound`] for a missing work order, or a storage
/// error.
pub fn reschedule(
    conn: &mut Connection,
    clock: &LocalClock,
    actor: &Actor,
    work_order_id: i64,
    new_date: &str,
) -> Result<ClaimLog> {
    let date = parse_date("new_date", Some(new_date))?
        .ok_or_else(|| DeskError::validation("new_date", "a new date is required"))?;

    let tx = conn.transaction()?;
    let detail = query::get_work_order_detail(&tx, work_order_id)?
        .ok_or(DeskError::WorkOrderNotFound(work_order_id))?;
    query::set_work_order_date(&tx, work_order_id, date)?;

    let old = detail
        .order
        .scheduled_date
        .map_or_else(|| "unscheduled".to_string(), |d| d.format(DATE_FORMAT).to_string());
    let entry = audit::record(
        &tx,
        clock,
        detail.order.claim_id,
        actor.user_id,
        &format!(
            "Work order rescheduled from {old} to {} by {}.",
            date.format(DATE_FORMAT),
            actor.name
        ),
    )?;
    tx.commit()?;
    tracing::info!(work_order_id, %date, "work order rescheduled");
    Ok(entry)
}
