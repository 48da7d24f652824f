//! Month calendar of upcoming work.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Month, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::query;
use crate::error::{DeskError, Result};

/// One work order placed on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub work_order_id: i64,
    pub claim_id: i64,
    pub address: String,
    pub vendor: Option<String>,
    pub assignee: Option<String>,
    pub scheduled_date: NaiveDate,
}

/// A year/month pair, used for navigation links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    /// Monday-first weeks; 0 pads days outside the month.
    pub weeks: Vec<[u32; 7]>,
    /// Entries keyed by day of month.
    pub days: BTreeMap<u32, Vec<CalendarEntry>>,
    pub previous: YearMonth,
    pub next: YearMonth,
}

fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DeskError::validation("month", format!("{year}-{month} is not a valid month")))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| DeskError::validation("year", format!("{year} is out of range")))?;
    Ok((start, end))
}

/// Monday-first week rows for a month, zero-padded at both ends.
fn week_grid(start: NaiveDate, end: NaiveDate) -> Vec<[u32; 7]> {
    let mut weeks = Vec::new();
    let mut week = [0_u32; 7];
    let mut day = start;
    while day < end {
        let column = day.weekday().num_days_from_monday() as usize;
        week[column] = day.day();
        if column == 6 {
            weeks.push(week);
            week = [0; 7];
        }
        day = day.succ_opt().unwrap_or(end);
    }
    if week.iter().any(|d| *d != 0) {
        weeks.push(week);
    }
    weeks
}

/// Work for one month: per claim, the latest-dated work order in range,
/// skipping claims stored as `Closed`.
///
/// # Errors
///
/// Returns a validation error for an impossible year/month, or a storage
/// error.
pub fn month_view(conn: &Connection, year: i32, month: u32) -> Result<MonthView> {
    let (start, end) = month_bounds(year, month)?;

    let mut latest: HashMap<i64, CalendarEntry> = HashMap::new();
    for (detail, address) in query::open_work_orders_between(conn, start, end)? {
        let Some(date) = detail.order.scheduled_date else {
            continue;
        };
        let entry = CalendarEntry {
            work_order_id: detail.order.id,
            claim_id: detail.order.claim_id,
            address,
            vendor: detail.vendor_name().map(str::to_string),
            assignee: detail.assignee_name().map(str::to_string),
            scheduled_date: date,
        };
        match latest.get(&entry.claim_id) {
            Some(current) if current.scheduled_date >= date => {}
            _ => {
                latest.insert(entry.claim_id, entry);
            }
        }
    }

    let mut days: BTreeMap<u32, Vec<CalendarEntry>> = BTreeMap::new();
    for entry in latest.into_values() {
        days.entry(entry.scheduled_date.day()).or_default().push(entry);
    }
    for entries in days.values_mut() {
        entries.sort_by_key(|e| (e.claim_id, e.work_order_id));
    }

    let month_name = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_default();
    let previous = start.pred_opt().map_or(YearMonth { year, month }, |d| YearMonth {
        year: d.year(),
        month: d.month(),
    });

    Ok(MonthView {
        year,
        month,
        month_name,
        weeks: week_grid(start, end),
        days,
        previous,
        next: YearMonth {
            year: end.year(),
            month: end.month(),
        },
    })
}
