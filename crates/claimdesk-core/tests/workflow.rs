//! End-to-end claim scenarios against a real on-disk database:
//! - assignment writes one or two log entries and always marks `Scheduled`
//! - invite failures surface as warnings without rolling back
//! - derived status and assignment labels on the dashboard
//! - rescheduling, reference policy, and deletion cascades

use chrono::{NaiveDate, TimeZone, Utc};
use claimdesk_core::audit;
use claimdesk_core::auth::{self, Registration};
use claimdesk_core::clock::LocalClock;
use claimdesk_core::config::{DeskConfig, ReferencePolicy};
use claimdesk_core::db::{self, query};
use claimdesk_core::lifecycle::{self, PhotoUpload, TransitionOutcome};
use claimdesk_core::model::{Actor, ClaimDetails, ClaimStatus, ContactKind, NewContact};
use claimdesk_core::status::{self, UNASSIGNED};
use claimdesk_core::uploads::UploadStore;
use claimdesk_core::workflow::{self, AssignmentForm, WorkflowContext};
use claimdesk_core::DeskError;
use rusqlite::Connection;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Desk {
    _dir: TempDir,
    conn: Connection,
    ctx: WorkflowContext,
    uploads: UploadStore,
    actor: Actor,
}

/// 2026-03-10 15:00 UTC, mid-morning in Chicago.
fn fixed_clock() -> LocalClock {
    LocalClock::fixed(
        chrono_tz::America::Chicago,
        Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap(),
    )
}

fn today() -> NaiveDate {
    fixed_clock().today()
}

fn desk_with(policy: ReferencePolicy) -> Desk {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = DeskConfig::default();
    config.storage.database = dir.path().join("claimdesk.db");
    config.storage.upload_dir = dir.path().join("uploads");
    config.storage.invite_dir = dir.path().join("ics");
    config.workflow.reference_policy = policy;

    let conn = db::open_database(&config.storage.database).expect("open db");
    let clock = fixed_clock();
    let user = auth::register(
        &conn,
        &clock,
        &Registration {
            email: "olive@example.com".to_string(),
            name: "Olive".to_string(),
            password: "pw".to_string(),
        },
    )
    .expect("register");

    Desk {
        ctx: WorkflowContext::with_clock(&config, clock),
        uploads: UploadStore::new(config.storage.upload_dir.clone()),
        actor: Actor::from(&user),
        conn,
        _dir: dir,
    }
}

fn desk() -> Desk {
    desk_with(ReferencePolicy::Lenient)
}

fn file_claim(desk: &mut Desk, address: &str) -> i64 {
    lifecycle::file_claim(
        &mut desk.conn,
        &desk.ctx.clock,
        &desk.uploads,
        ClaimDetails {
            address: address.to_string(),
            homeowner_name: Some("Pat Doe".to_string()),
            ..ClaimDetails::default()
        },
        &[],
    )
    .expect("file claim")
    .claim
    .id
}

fn add_contact(desk: &Desk, kind: ContactKind, name: &str, email: Option<&str>) -> i64 {
    query::insert_contact(
        &desk.conn,
        kind,
        &NewContact {
            name: name.to_string(),
            contact_number: None,
            email: email.map(str::to_string),
        },
    )
    .expect("insert contact")
    .id
}

fn form(date: &str, time: &str) -> AssignmentForm {
    AssignmentForm {
        scheduled_date: Some(date.to_string()),
        scheduled_time: Some(time.to_string()),
        ..AssignmentForm::default()
    }
}

fn stored_status(desk: &Desk, claim_id: i64) -> ClaimStatus {
    query::require_claim(&desk.conn, claim_id).unwrap().status
}

fn summary(desk: &Desk, claim_id: i64) -> status::ClaimSummary {
    let dashboard = status::load_dashboard(&desk.conn, today()).unwrap();
    [dashboard.open, dashboard.scheduled, dashboard.deferred, dashboard.closed]
        .into_iter()
        .flatten()
        .find(|s| s.claim.id == claim_id)
        .expect("claim on dashboard")
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[test]
fn first_assignment_logs_twice_later_ones_once() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    let jane = add_contact(&desk, ContactKind::Assignee, "Jane", Some("jane@example.com"));

    let mut first = form("2026-03-20", "09:00");
    first.assignee_id = Some(jane.to_string());
    let outcome =
        workflow::assign_work_order(&mut desk.conn, &desk.ctx, &desk.actor, claim_id, &first).unwrap();
    assert_eq!(outcome.log_entries.len(), 2);
    assert_eq!(
        outcome.log_entries[1].action,
        "Claim first assigned to Assignee: Jane by Olive"
    );
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let second = workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("2026-03-25", "10:00"),
    )
    .unwrap();
    assert_eq!(second.log_entries.len(), 1);
    assert_eq!(audit::entries_for_claim(&desk.conn, claim_id).unwrap().len(), 3);
}

#[test]
fn assignment_always_stores_scheduled_even_for_past_dates() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");

    workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("2025-01-01", "09:00"),
    )
    .unwrap();
    assert_eq!(stored_status(&desk, claim_id), ClaimStatus::Scheduled);
    // The dashboard derives Open again because nothing is upcoming.
    assert_eq!(summary(&desk, claim_id).effective_status, ClaimStatus::Open);
}

#[test]
fn malformed_time_persists_nothing() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");

    let err = workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("2026-03-20", "25:99"),
    )
    .unwrap_err();
    assert!(matches!(err, DeskError::Validation { field: "scheduled_time", .. }));
    assert_eq!(query::count_work_orders(&desk.conn, claim_id).unwrap(), 0);
    assert_eq!(stored_status(&desk, claim_id), ClaimStatus::Open);
    assert!(audit::entries_for_claim(&desk.conn, claim_id).unwrap().is_empty());
}

#[test]
fn missing_time_commits_but_warns_about_the_invite() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");

    let outcome = workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("2026-03-20", ""),
    )
    .unwrap();
    assert_eq!(outcome.invite_path, None);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("Failed to generate calendar invite"));
    assert_eq!(query::count_work_orders(&desk.conn, claim_id).unwrap(), 1);
}

#[test]
fn assignment_without_date_still_schedules() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");

    let outcome = workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("", ""),
    )
    .unwrap();
    assert_eq!(outcome.work_order.scheduled_date, None);
    assert_eq!(outcome.invite_path, None);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("Failed to generate calendar invite"));

    // Stored as scheduled, but with no dated order it still reads as open.
    assert_eq!(stored_status(&desk, claim_id), ClaimStatus::Scheduled);
    let row = summary(&desk, claim_id);
    assert_eq!(row.effective_status, ClaimStatus::Open);
    assert_eq!(row.scheduled_display, "");
}

#[test]
fn invite_is_written_with_attendees() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    let vendor = add_contact(&desk, ContactKind::Vendor, "Acme", Some("acme@example.com"));

    let mut submitted = form("2026-03-20", "09:00");
    submitted.vendor_id = Some(vendor.to_string());
    let outcome =
        workflow::assign_work_order(&mut desk.conn, &desk.ctx, &desk.actor, claim_id, &submitted)
            .unwrap();

    let path = outcome.invite_path.expect("invite written");
    assert!(path.ends_with(format!("workorder_claim_{claim_id}.ics")));
    let ics = desk.ctx.invites.read(claim_id).unwrap();
    assert!(ics.contains("ATTENDEE;CN=Acme:mailto:acme@example.com\r\n"));
    assert!(ics.contains("DTSTART:20260320T140000Z\r\n"));
}

#[test]
fn unknown_reference_follows_policy() {
    let mut lenient = desk();
    let claim_id = file_claim(&mut lenient, "1 Main St");
    let mut submitted = form("2026-03-20", "09:00");
    submitted.vendor_id = Some("404".to_string());

    let outcome = workflow::assign_work_order(
        &mut lenient.conn,
        &lenient.ctx,
        &lenient.actor,
        claim_id,
        &submitted,
    )
    .unwrap();
    assert_eq!(outcome.work_order.vendor_id, None);

    let mut strict = desk_with(ReferencePolicy::Strict);
    let claim_id = file_claim(&mut strict, "1 Main St");
    let err = workflow::assign_work_order(
        &mut strict.conn,
        &strict.ctx,
        &strict.actor,
        claim_id,
        &submitted,
    )
    .unwrap_err();
    assert!(matches!(err, DeskError::Validation { field: "vendor_id", .. }));
    assert_eq!(query::count_work_orders(&strict.conn, claim_id).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Derived status
// ---------------------------------------------------------------------------

#[test]
fn new_claim_is_open_and_unassigned() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    let row = summary(&desk, claim_id);
    assert_eq!(row.effective_status, ClaimStatus::Open);
    assert_eq!(row.assignment.label, UNASSIGNED);
    assert_eq!(row.scheduled_display, "");
}

#[test]
fn future_assignee_only_order_is_scheduled() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    let jane = add_contact(&desk, ContactKind::Assignee, "Jane", None);
    let mut submitted = form("2026-03-20", "09:00");
    submitted.assignee_id = Some(jane.to_string());
    workflow::assign_work_order(&mut desk.conn, &desk.ctx, &desk.actor, claim_id, &submitted)
        .unwrap();

    let row = summary(&desk, claim_id);
    assert_eq!(row.effective_status, ClaimStatus::Scheduled);
    assert_eq!(row.assignment.label, "Jane");
    assert_eq!(row.scheduled_display, "2026-03-20");
}

#[test]
fn two_past_orders_show_the_later_one() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    let early = add_contact(&desk, ContactKind::Vendor, "Early Co", None);
    let late = add_contact(&desk, ContactKind::Vendor, "Late Co", None);

    for (vendor, date) in [(early, "2026-02-01"), (late, "2026-03-01")] {
        let mut submitted = form(date, "09:00");
        submitted.vendor_id = Some(vendor.to_string());
        workflow::assign_work_order(&mut desk.conn, &desk.ctx, &desk.actor, claim_id, &submitted)
            .unwrap();
    }

    let row = summary(&desk, claim_id);
    assert_eq!(row.effective_status, ClaimStatus::Open);
    assert_eq!(row.assignment.label, "Late Co");
    assert_eq!(row.scheduled_display, "2026-03-01");
}

#[test]
fn deferred_wins_over_future_work() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("2026-04-01", "09:00"),
    )
    .unwrap();
    lifecycle::defer_claim(&mut desk.conn, &desk.ctx.clock, &desk.actor, claim_id, "Parts").unwrap();

    assert_eq!(summary(&desk, claim_id).effective_status, ClaimStatus::Deferred);
}

// ---------------------------------------------------------------------------
// Transitions, rescheduling, deletion
// ---------------------------------------------------------------------------

#[test]
fn manual_change_to_same_status_is_silent() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    let outcome = lifecycle::change_status(
        &mut desk.conn,
        &desk.ctx.clock,
        &desk.actor,
        claim_id,
        ClaimStatus::Open,
    )
    .unwrap();
    assert!(matches!(outcome, TransitionOutcome::Unchanged { .. }));
    assert!(audit::entries_for_claim(&desk.conn, claim_id).unwrap().is_empty());
}

#[test]
fn reschedule_moves_date_and_logs_once() {
    let mut desk = desk();
    let claim_id = file_claim(&mut desk, "1 Main St");
    let outcome = workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("2026-03-20", "09:00"),
    )
    .unwrap();
    let before = audit::entries_for_claim(&desk.conn, claim_id).unwrap().len();

    let entry = workflow::reschedule(
        &mut desk.conn,
        &desk.ctx.clock,
        &desk.actor,
        outcome.work_order.id,
        "2026-03-27",
    )
    .unwrap();
    assert_eq!(
        entry.action,
        "Work order rescheduled from 2026-03-20 to 2026-03-27 by Olive."
    );
    let logs = audit::entries_for_claim(&desk.conn, claim_id).unwrap();
    assert_eq!(logs.len(), before + 1);
    assert_eq!(logs[0].id, entry.id, "newest entry comes first");

    assert!(matches!(
        workflow::reschedule(&mut desk.conn, &desk.ctx.clock, &desk.actor, 9999, "2026-03-27"),
        Err(DeskError::WorkOrderNotFound(9999))
    ));
    assert!(matches!(
        workflow::reschedule(&mut desk.conn, &desk.ctx.clock, &desk.actor, outcome.work_order.id, "soon"),
        Err(DeskError::Validation { .. })
    ));
}

#[test]
fn deleting_a_claim_removes_everything() {
    let mut desk = desk();
    let filed = lifecycle::file_claim(
        &mut desk.conn,
        &desk.ctx.clock,
        &desk.uploads,
        ClaimDetails {
            address: "1 Main St".to_string(),
            ..ClaimDetails::default()
        },
        &[PhotoUpload {
            original_name: "leak.jpg".to_string(),
            bytes: b"jpeg".to_vec(),
        }],
    )
    .unwrap();
    let claim_id = filed.claim.id;
    let photo = &filed.photos[0];
    assert!(desk.uploads.root().join(&photo.filename).exists());
    query::insert_photo(&desk.conn, claim_id, "already_gone.jpg").unwrap();
    workflow::assign_work_order(
        &mut desk.conn,
        &desk.ctx,
        &desk.actor,
        claim_id,
        &form("2026-03-20", "09:00"),
    )
    .unwrap();

    let report = lifecycle::delete_claim(&mut desk.conn, &desk.uploads, claim_id).unwrap();
    assert_eq!(report.photos_removed, 1);
    assert!(report.warnings.is_empty());
    assert!(!desk.uploads.root().join(&photo.filename).exists());

    assert!(query::get_claim(&desk.conn, claim_id).unwrap().is_none());
    assert_eq!(query::count_work_orders(&desk.conn, claim_id).unwrap(), 0);
    assert!(audit::entries_for_claim(&desk.conn, claim_id).unwrap().is_empty());
    assert!(query::list_photos(&desk.conn, claim_id).unwrap().is_empty());
}
