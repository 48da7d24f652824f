//! Append-only claim audit log.
//!
//! Rows are only ever inserted here; the one deletion path is the claim
//! cascade in [`crate::lifecycle::delete_claim`].

use rusqlite::{Connection, params};

use crate::clock::LocalClock;
use crate::error::{DeskError, Result};
use crate::model::ClaimLog;

/// Append one entry stamped with the clock's local time.
///
/// # Errors
///
/// Returns a validation error for blank action text, or a storage error if
/// the insert fails.
pub fn record(
    conn: &Connection,
    clock: &LocalClock,
    claim_id: i64,
    user_id: i64,
    action: &str,
) -> Result<ClaimLog> {
    let action = action.trim();
    if action.is_empty() {
        return Err(DeskError::validation("action", "log action must not be empty"));
    }

    let timestamp = clock.now();
    conn.execute(
        "INSERT INTO claim_logs (claim_id, user_id, timestamp, created_at_us, action)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![claim_id, user_id, timestamp, clock.now_us(), action],
    )?;
    let id = conn.last_insert_rowid();

    let user_name: String = conn.query_row(
        "SELECT name FROM users WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    tracing::debug!(claim_id, log_id = id, "audit entry recorded");

    Ok(ClaimLog {
        id,
        claim_id,
        user_id,
        user_name,
        timestamp,
        action: action.to_string(),
    })
}

/// Entries for a claim, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn entries_for_claim(conn: &Connection, claim_id: i64) -> Result<Vec<ClaimLog>> {
    let mut stmt = conn.prepare(
        "SELECT l.log_id, l.claim_id, l.user_id, u.name, l.timestamp, l.action
         FROM claim_logs l
         JOIN users u ON u.user_id = l.user_id
         WHERE l.claim_id = ?1
         ORDER BY l.created_at_us DESC, l.log_id DESC",
    )?;
    let rows = stmt
        .query_map([claim_id], |row| {
            Ok(ClaimLog {
                id: row.get(0)?,
                claim_id: row.get(1)?,
                user_id: row.get(2)?,
                user_name: row.get(3)?,
                timestamp: row.get(4)?,
                action: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_in_memory, query};
    use crate::model::ClaimDetails;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn seed(conn: &Connection) -> (i64, i64) {
        conn.execute(
            "INSERT INTO users (email, name, password_hash, created_at_us)
             VALUES ('ops@example.com', 'Olive Ops', 'x', 0)",
            [],
        )
        .unwrap();
        let user_id = conn.last_insert_rowid();
        let claim = query::insert_claim(
            conn,
            &ClaimDetails {
                address: "1 Main St".to_string(),
                ..ClaimDetails::default()
            },
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            0,
        )
        .unwrap();
        (user_id, claim.id)
    }

    fn clock_at(minute: u32) -> LocalClock {
        let instant = Utc.with_ymd_and_hms(2026, 2, 3, 15, minute, 0).unwrap();
        LocalClock::fixed(chrono_tz::America::Chicago, instant)
    }

    #[test]
    fn blank_action_is_rejected_and_nothing_written() {
        let conn = open_in_memory().unwrap();
        let (user_id, claim_id) = seed(&conn);
        let err = record(&conn, &clock_at(0), claim_id, user_id, "   ").unwrap_err();
        assert!(matches!(err, DeskError::Validation { field: "action", .. }));
        assert!(entries_for_claim(&conn, claim_id).unwrap().is_empty());
    }

    #[test]
    fn entries_are_newest_first_with_user_names() {
        let conn = open_in_memory().unwrap();
        let (user_id, claim_id) = seed(&conn);
        record(&conn, &clock_at(0), claim_id, user_id, "first").unwrap();
        record(&conn, &clock_at(5), claim_id, user_id, "second").unwrap();
        let entry = record(&conn, &clock_at(5), claim_id, user_id, "third").unwrap();
        assert_eq!(entry.user_name, "Olive Ops");
        assert_eq!(entry.timestamp.offset().local_minus_utc(), -6 * 3600);

        let actions: Vec<String> = entries_for_claim(&conn, claim_id)
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, ["third", "second", "first"]);
    }

    #[test]
    fn timestamps_survive_storage() {
        let conn = open_in_memory().unwrap();
        let (user_id, claim_id) = seed(&conn);
        let written = record(&conn, &clock_at(30), claim_id, user_id, "logged").unwrap();
        let read = entries_for_claim(&conn, claim_id).unwrap();
        assert_eq!(read[0].timestamp, written.timestamp);
        assert_eq!(
            read[0].timestamp.naive_local() - written.timestamp.naive_local(),
            Duration::zero()
        );
    }
}
