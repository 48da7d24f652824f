//! `SQLite` query helpers for claims, contacts, work orders, and photos.
//!
//! All functions take a shared `&Connection` (a `Transaction` derefs to one)
//! and return typed structs, never raw rows. Audit-log rows live in
//! [`crate::audit`]; users and sessions in [`crate::auth`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{DeskError, Result};
use crate::model::{
    Claim, ClaimClosure, ClaimDetails, ClaimPhoto, ClaimStatus, Contact, ContactKind, NewContact,
    WorkOrder, WorkOrderDetail,
};

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

const CLAIM_COLUMNS: &str = "claim_id, address, homeowner_name, homeowner_email, \
     homeowner_phone, cobuyer_name, cobuyer_email, cobuyer_phone, warranty_type, \
     issue_description, status, date_reported";

fn claim_from_row(row: &Row<'_>) -> rusqlite::Result<Claim> {
    Ok(Claim {
        id: row.get(0)?,
        address: row.get(1)?,
        homeowner_name: row.get(2)?,
        homeowner_email: row.get(3)?,
        homeowner_phone: row.get(4)?,
        cobuyer_name: row.get(5)?,
        cobuyer_email: row.get(6)?,
        cobuyer_phone: row.get(7)?,
        warranty_type: row.get(8)?,
        issue_description: row.get(9)?,
        status: row.get(10)?,
        date_reported: row.get(11)?,
    })
}

/// Insert a new claim with status `Open`.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_claim(
    conn: &Connection,
    details: &ClaimDetails,
    date_reported: NaiveDate,
    created_at_us: i64,
) -> Result<Claim> {
    conn.execute(
        "INSERT INTO claims (
            address, homeowner_name, homeowner_email, homeowner_phone,
            cobuyer_name, cobuyer_email, cobuyer_phone, warranty_type,
            issue_description, status, date_reported, created_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            details.address,
            details.homeowner_name,
            details.homeowner_email,
            details.homeowner_phone,
            details.cobuyer_name,
            details.cobuyer_email,
            details.cobuyer_phone,
            details.warranty_type,
            details.issue_description,
            ClaimStatus::Open,
            date_reported,
            created_at_us,
        ],
    )?;
    require_claim(conn, conn.last_insert_rowid())
}

/// Fetch one claim by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_claim(conn: &Connection, claim_id: i64) -> Result<Option<Claim>> {
    let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = ?1");
    Ok(conn
        .query_row(&sql, [claim_id], claim_from_row)
        .optional()?)
}

/// Fetch one claim, mapping a miss to [`DeskError::ClaimNotFound`].
///
/// # Errors
///
/// Returns an error if the query fails or the claim does not exist.
pub fn require_claim(conn: &Connection, claim_id: i64) -> Result<Claim> {
    get_claim(conn, claim_id)?.ok_or(DeskError::ClaimNotFound(claim_id))
}

/// All claims, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_claims(conn: &Connection) -> Result<Vec<Claim>> {
    let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims ORDER BY claim_id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], claim_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Overwrite a claim's editable fields. Status and report date are untouched.
///
/// # Errors
///
/// Returns an error if the update fails or the claim does not exist.
pub fn update_claim_details(
    conn: &Connection,
    claim_id: i64,
    details: &ClaimDetails,
) -> Result<Claim> {
    let changed = conn.execute(
        "UPDATE claims SET
            address = ?2, homeowner_name = ?3, homeowner_email = ?4, homeowner_phone = ?5,
            cobuyer_name = ?6, cobuyer_email = ?7, cobuyer_phone = ?8,
            warranty_type = ?9, issue_description = ?10
         WHERE claim_id = ?1",
        params![
            claim_id,
            details.address,
            details.homeowner_name,
            details.homeowner_email,
            details.homeowner_phone,
            details.cobuyer_name,
            details.cobuyer_email,
            details.cobuyer_phone,
            details.warranty_type,
            details.issue_description,
        ],
    )?;
    if changed == 0 {
        return Err(DeskError::ClaimNotFound(claim_id));
    }
    require_claim(conn, claim_id)
}

/// Set the stored status of a claim.
///
/// # Errors
///
/// Returns an error if the update fails or the claim does not exist.
pub fn set_claim_status(conn: &Connection, claim_id: i64, status: ClaimStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE claims SET status = ?2 WHERE claim_id = ?1",
        params![claim_id, status],
    )?;
    if changed == 0 {
        return Err(DeskError::ClaimNotFound(claim_id));
    }
    Ok(())
}

/// Delete a claim and every dependent row.
///
/// Foreign keys cascade as well; the explicit deletes keep the removal
/// complete even on a connection opened without `foreign_keys = ON`.
///
/// # Errors
///
/// Returns an error if any delete fails or the claim does not exist.
pub fn delete_claim_rows(conn: &Connection, claim_id: i64) -> Result<()> {
    for table in ["work_orders", "claim_logs", "claim_closures", "claim_photos"] {
        conn.execute(&format!("DELETE FROM {table} WHERE claim_id = ?1"), [claim_id])?;
    }
    let changed = conn.execute("DELETE FROM claims WHERE claim_id = ?1", [claim_id])?;
    if changed == 0 {
        return Err(DeskError::ClaimNotFound(claim_id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Vendors and assignees
// ---------------------------------------------------------------------------

fn contact_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Contact>> {
    let id: Option<i64> = row.get(offset)?;
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(Some(Contact {
        id,
        name: row.get(offset + 1)?,
        contact_number: row.get(offset + 2)?,
        email: row.get(offset + 3)?,
    }))
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        contact_number: row.get(2)?,
        email: row.get(3)?,
    })
}

/// Add a vendor or assignee.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_contact(conn: &Connection, kind: ContactKind, contact: &NewContact) -> Result<Contact> {
    conn.execute(
        &format!(
            "INSERT INTO {} (name, contact_number, email) VALUES (?1, ?2, ?3)",
            kind.table()
        ),
        params![contact.name, contact.contact_number, contact.email],
    )?;
    Ok(Contact {
        id: conn.last_insert_rowid(),
        name: contact.name.clone(),
        contact_number: contact.contact_number.clone(),
        email: contact.email.clone(),
    })
}

/// Fetch one vendor or assignee.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_contact(conn: &Connection, kind: ContactKind, id: i64) -> Result<Option<Contact>> {
    let sql = format!(
        "SELECT contact_id, name, contact_number, email FROM {} WHERE contact_id = ?1",
        kind.table()
    );
    Ok(conn.query_row(&sql, [id], contact_from_row).optional()?)
}

/// All vendors or assignees, by name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_contacts(conn: &Connection, kind: ContactKind) -> Result<Vec<Contact>> {
    let sql = format!(
        "SELECT contact_id, name, contact_number, email FROM {} \
         ORDER BY name COLLATE NOCASE ASC, contact_id ASC",
        kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], contact_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Work orders
// ---------------------------------------------------------------------------

/// Fields for a work order about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkOrder {
    pub claim_id: i64,
    pub vendor_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at_us: i64,
}

/// Columns read by [`detail_from_row`]; extra columns start at index 17.
const DETAIL_COLUMNS: &str = "
        w.work_order_id, w.claim_id, w.vendor_id, w.assignee_id, w.scheduled_date,
        w.scheduled_time, w.status, w.notes, w.created_at_us,
        v.contact_id, v.name, v.contact_number, v.email,
        a.contact_id, a.name, a.contact_number, a.email";

const DETAIL_FROM: &str = "
     FROM work_orders w
     LEFT JOIN vendors v ON v.contact_id = w.vendor_id
     LEFT JOIN assignees a ON a.contact_id = w.assignee_id";

fn work_order_from_row(row: &Row<'_>) -> rusqlite::Result<WorkOrder> {
    Ok(WorkOrder {
        id: row.get(0)?,
        claim_id: row.get(1)?,
        vendor_id: row.get(2)?,
        assignee_id: row.get(3)?,
        scheduled_date: row.get(4)?,
        scheduled_time: row.get(5)?,
        status: row.get(6)?,
        notes: row.get(7)?,
        created_at_us: row.get(8)?,
    })
}

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<WorkOrderDetail> {
    Ok(WorkOrderDetail {
        order: work_order_from_row(row)?,
        vendor: contact_at(row, 9)?,
        assignee: contact_at(row, 13)?,
    })
}

/// Insert a work order row.
///
/// # Errors
///
/// Returns an error if the insert fails (including a dangling claim,
/// vendor, or assignee reference).
pub fn insert_work_order(conn: &Connection, order: &NewWorkOrder) -> Result<WorkOrder> {
    conn.execute(
        "INSERT INTO work_orders (
            claim_id, vendor_id, assignee_id, scheduled_date, scheduled_time,
            status, notes, created_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            order.claim_id,
            order.vendor_id,
            order.assignee_id,
            order.scheduled_date,
            order.scheduled_time,
            order.status,
            order.notes,
            order.created_at_us,
        ],
    )?;
    Ok(WorkOrder {
        id: conn.last_insert_rowid(),
        claim_id: order.claim_id,
        vendor_id: order.vendor_id,
        assignee_id: order.assignee_id,
        scheduled_date: order.scheduled_date,
        scheduled_time: order.scheduled_time,
        status: order.status.clone(),
        notes: order.notes.clone(),
        created_at_us: order.created_at_us,
    })
}

/// Fetch one work order with its contacts resolved.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_work_order_detail(conn: &Connection, work_order_id: i64) -> Result<Option<WorkOrderDetail>> {
    let sql = format!("SELECT {DETAIL_COLUMNS} {DETAIL_FROM} WHERE w.work_order_id = ?1");
    Ok(conn
        .query_row(&sql, [work_order_id], detail_from_row)
        .optional()?)
}

/// Work orders for one claim, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn work_order_details_for_claim(conn: &Connection, claim_id: i64) -> Result<Vec<WorkOrderDetail>> {
    let sql = format!(
        "SELECT {DETAIL_COLUMNS} {DETAIL_FROM} WHERE w.claim_id = ?1 ORDER BY w.work_order_id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([claim_id], detail_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Every work order, grouped by claim and in insertion order within a claim.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn all_work_order_details(conn: &Connection) -> Result<Vec<WorkOrderDetail>> {
    let sql = format!(
        "SELECT {DETAIL_COLUMNS} {DETAIL_FROM} ORDER BY w.claim_id ASC, w.work_order_id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], detail_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Work orders scheduled in `[start, end)` whose claim is not stored as
/// `Closed`, paired with the claim address.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn open_work_orders_between(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(WorkOrderDetail, String)>> {
    let sql = format!(
        "SELECT {DETAIL_COLUMNS}, c.address {DETAIL_FROM}
         JOIN claims c ON c.claim_id = w.claim_id
         WHERE w.scheduled_date >= ?1 AND w.scheduled_date < ?2 AND c.status <> ?3
         ORDER BY w.work_order_id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![start, end, ClaimStatus::Closed], |row| {
            Ok((detail_from_row(row)?, row.get::<_, String>(17)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Number of work orders ever created for a claim.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_work_orders(conn: &Connection, claim_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM work_orders WHERE claim_id = ?1",
        [claim_id],
        |row| row.get(0),
    )?)
}

/// Move a work order to a new date.
///
/// # Errors
///
/// Returns an error if the update fails or the work order does not exist.
pub fn set_work_order_date(conn: &Connection, work_order_id: i64, date: NaiveDate) -> Result<()> {
    let changed = conn.execute(
        "UPDATE work_orders SET scheduled_date = ?2 WHERE work_order_id = ?1",
        params![work_order_id, date],
    )?;
    if changed == 0 {
        return Err(DeskError::WorkOrderNotFound(work_order_id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

/// Record an uploaded photo against a claim.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_photo(conn: &Connection, claim_id: i64, filename: &str) -> Result<ClaimPhoto> {
    conn.execute(
        "INSERT INTO claim_photos (claim_id, filename) VALUES (?1, ?2)",
        params![claim_id, filename],
    )?;
    Ok(ClaimPhoto {
        id: conn.last_insert_rowid(),
        claim_id,
        filename: filename.to_string(),
    })
}

/// Photos attached to a claim, in upload order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_photos(conn: &Connection, claim_id: i64) -> Result<Vec<ClaimPhoto>> {
    let mut stmt = conn.prepare(
        "SELECT photo_id, claim_id, filename FROM claim_photos
         WHERE claim_id = ?1 ORDER BY photo_id ASC",
    )?;
    let rows = stmt
        .query_map([claim_id], |row| {
            Ok(ClaimPhoto {
                id: row.get(0)?,
                claim_id: row.get(1)?,
                filename: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Closures
// ---------------------------------------------------------------------------

/// Record why a claim was closed.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_closure(
    conn: &Connection,
    claim_id: i64,
    reasons: Option<&str>,
    notes: Option<&str>,
    timestamp: DateTime<FixedOffset>,
    created_at_us: i64,
) -> Result<ClaimClosure> {
    conn.execute(
        "INSERT INTO claim_closures (claim_id, reasons, notes, timestamp, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![claim_id, reasons, notes, timestamp, created_at_us],
    )?;
    Ok(ClaimClosure {
        id: conn.last_insert_rowid(),
        claim_id,
        reasons: reasons.map(str::to_string),
        notes: notes.map(str::to_string),
        timestamp,
    })
}

/// The most recent closure record for a claim, if it was ever closed.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn latest_closure(conn: &Connection, claim_id: i64) -> Result<Option<ClaimClosure>> {
    Ok(conn
        .query_row(
            "SELECT closure_id, claim_id, reasons, notes, timestamp FROM claim_closures
             WHERE claim_id = ?1 ORDER BY created_at_us DESC, closure_id DESC LIMIT 1",
            [claim_id],
            |row| {
                Ok(ClaimClosure {
                    id: row.get(0)?,
                    claim_id: row.get(1)?,
                    reasons: row.get(2)?,
                    notes: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            },
        )
        .optional()?)
}
