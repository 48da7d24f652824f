//! Claim status derivation and assignment labels.
//!
//! A claim's stored status is authoritative only for `Deferred` and
//! `Closed`. Every other claim is `Scheduled` while it has a work order dated
//! today or later and `Open` otherwise; this is recomputed on every read and
//! never written back.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::query;
use crate::error::Result;
use crate::model::{Claim, ClaimStatus, WorkOrder, WorkOrderDetail};

/// Label used when no scheduled work order names anyone.
pub const UNASSIGNED: &str = "Unassigned";

/// Status shown for a claim given its work orders and the local date.
#[must_use]
pub fn effective_status(stored: ClaimStatus, work_orders: &[WorkOrder], today: NaiveDate) -> ClaimStatus {
    match stored {
        ClaimStatus::Deferred | ClaimStatus::Closed => stored,
        ClaimStatus::Open | ClaimStatus::Scheduled => {
            let upcoming = work_orders
                .iter()
                .filter_map(|order| order.scheduled_date)
                .any(|date| date >= today);
            if upcoming {
                ClaimStatus::Scheduled
            } else {
                ClaimStatus::Open
            }
        }
    }
}

/// Who a claim is currently assigned to, taken from its latest-dated work
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub label: String,
    pub scheduled_date: Option<NaiveDate>,
    pub work_order_id: Option<i64>,
}

impl Assignment {
    fn unassigned() -> Self {
        Self {
            label: UNASSIGNED.to_string(),
            scheduled_date: None,
            work_order_id: None,
        }
    }

    /// `YYYY-MM-DD`, or an empty string when nothing is scheduled.
    #[must_use]
    pub fn scheduled_display(&self) -> String {
        self.scheduled_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Pick the work order with the greatest scheduled date (the last one wins
/// a tie) and label it "assignee, vendor".
#[must_use]
pub fn current_assignment(details: &[WorkOrderDetail]) -> Assignment {
    let mut latest: Option<(&WorkOrderDetail, NaiveDate)> = None;
    for detail in details {
        let Some(date) = detail.order.scheduled_date else {
            continue;
        };
        if latest.is_none_or(|(_, best)| date >= best) {
            latest = Some((detail, date));
        }
    }

    let Some((detail, date)) = latest else {
        return Assignment::unassigned();
    };

    let names: Vec<&str> = [detail.assignee_name(), detail.vendor_name()]
        .into_iter()
        .flatten()
        .collect();
    let label = if names.is_empty() {
        UNASSIGNED.to_string()
    } else {
        names.join(", ")
    };

    Assignment {
        label,
        scheduled_date: Some(date),
        work_order_id: Some(detail.order.id),
    }
}

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimSummary {
    pub claim: Claim,
    pub effective_status: ClaimStatus,
    pub assignment: Assignment,
    pub scheduled_display: String,
}

/// Combine a claim with its work orders into a dashboard row.
#[must_use]
pub fn summarize(claim: Claim, details: &[WorkOrderDetail], today: NaiveDate) -> ClaimSummary {
    let orders: Vec<WorkOrder> = details.iter().map(|d| d.order.clone()).collect();
    let effective_status = effective_status(claim.status, &orders, today);
    let assignment = current_assignment(details);
    let scheduled_display = assignment.scheduled_display();
    ClaimSummary {
        claim,
        effective_status,
        assignment,
        scheduled_display,
    }
}

/// Claims bucketed by effective status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub open: Vec<ClaimSummary>,
    pub scheduled: Vec<ClaimSummary>,
    pub deferred: Vec<ClaimSummary>,
    pub closed: Vec<ClaimSummary>,
}

impl Dashboard {
    #[must_use]
    pub fn build(summaries: impl IntoIterator<Item = ClaimSummary>) -> Self {
        let mut dashboard = Self::default();
        for summary in summaries {
            let bucket = match summary.effective_status {
                ClaimStatus::Open => &mut dashboard.open,
                ClaimStatus::Scheduled => &mut dashboard.scheduled,
                ClaimStatus::Deferred => &mut dashboard.deferred,
                ClaimStatus::Closed => &mut dashboard.closed,
            };
            bucket.push(summary);
        }
        dashboard
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len() + self.scheduled.len() + self.deferred.len() + self.closed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load every claim with its work orders and bucket them.
///
/// # Errors
///
/// Returns an error if either query fails.
pub fn load_dashboard(conn: &Connection, today: NaiveDate) -> Result<Dashboard> {
    let claims = query::list_claims(conn)?;
    let mut by_claim: HashMap<i64, Vec<WorkOrderDetail>> = HashMap::new();
    for detail in query::all_work_order_details(conn)? {
        by_claim.entry(detail.order.claim_id).or_default().push(detail);
    }

    let summaries = claims.into_iter().map(|claim| {
        let details = by_claim.remove(&claim.id).unwrap_or_default();
        summarize(claim, &details, today)
    });
    Ok(Dashboard::build(summaries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Contact;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(id: i64, date: Option<NaiveDate>) -> WorkOrder {
        WorkOrder {
            id,
            claim_id: 1,
            vendor_id: None,
            assignee_id: None,
            scheduled_date: date,
            scheduled_time: None,
            status: "Scheduled".to_string(),
            notes: None,
            created_at_us: id,
        }
    }

    fn contact(id: i64, name: &str) -> Contact {
        Contact {
            id,
            name: name.to_string(),
            contact_number: None,
            email: None,
        }
    }

    fn detail(id: i64, date: Option<NaiveDate>, assignee: Option<&str>, vendor: Option<&str>) -> WorkOrderDetail {
        WorkOrderDetail {
            order: order(id, date),
            vendor: vendor.map(|n| contact(10 + id, n)),
            assignee: assignee.map(|n| contact(20 + id, n)),
        }
    }

    fn claim(status: ClaimStatus) -> Claim {
        Claim {
            id: 1,
            address: "1 Main St".to_string(),
            homeowner_name: None,
            homeowner_email: None,
            homeowner_phone: None,
            cobuyer_name: None,
            cobuyer_email: None,
            cobuyer_phone: None,
            warranty_type: None,
            issue_description: None,
            status,
            date_reported: day(2026, 1, 1),
        }
    }

    #[test]
    fn no_work_orders_is_open_and_unassigned() {
        let summary = summarize(claim(ClaimStatus::Open), &[], day(2026, 3, 1));
        assert_eq!(summary.effective_status, ClaimStatus::Open);
        assert_eq!(summary.assignment.label, UNASSIGNED);
        assert_eq!(summary.scheduled_display, "");
    }

    #[test]
    fn future_order_with_assignee_only() {
        let today = day(2026, 3, 1);
        let details = [detail(1, Some(day(2026, 3, 9)), Some("Jane"), None)];
        let summary = summarize(claim(ClaimStatus::Open), &details, today);
        assert_eq!(summary.effective_status, ClaimStatus::Scheduled);
        assert_eq!(summary.assignment.label, "Jane");
        assert_eq!(summary.scheduled_display, "2026-03-09");
    }

    #[test]
    fn past_orders_use_latest_date_and_fall_back_to_open() {
        let today = day(2026, 3, 1);
        let details = [
            detail(1, Some(day(2026, 1, 5)), None, Some("Acme")),
            detail(2, Some(day(2026, 2, 5)), Some("Jane"), Some("Bolt")),
        ];
        let summary = summarize(claim(ClaimStatus::Scheduled), &details, today);
        assert_eq!(summary.effective_status, ClaimStatus::Open);
        assert_eq!(summary.assignment.label, "Jane, Bolt");
        assert_eq!(summary.assignment.work_order_id, Some(2));
    }

    #[test]
    fn order_dated_today_counts_as_scheduled() {
        let today = day(2026, 3, 1);
        let orders = [order(1, Some(today))];
        assert_eq!(
            effective_status(ClaimStatus::Open, &orders, today),
            ClaimStatus::Scheduled
        );
    }

    #[test]
    fn tie_on_date_takes_the_last_order() {
        let date = day(2026, 3, 5);
        let details = [
            detail(1, Some(date), Some("First"), None),
            detail(2, Some(date), None, Some("Second")),
        ];
        assert_eq!(current_assignment(&details).label, "Second");
    }

    #[test]
    fn undated_orders_are_ignored_for_assignment() {
        let details = [detail(1, None, Some("Jane"), None)];
        let assignment = current_assignment(&details);
        assert_eq!(assignment.label, UNASSIGNED);
        assert_eq!(assignment.work_order_id, None);
    }

    #[test]
    fn dated_order_without_names_is_unassigned_but_keeps_date() {
        let details = [detail(1, Some(day(2026, 3, 5)), None, None)];
        let assignment = current_assignment(&details);
        assert_eq!(assignment.label, UNASSIGNED);
        assert_eq!(assignment.scheduled_display(), "2026-03-05");
    }

    #[test]
    fn dashboard_buckets_by_effective_status() {
        let today = day(2026, 3, 1);
        let future = [detail(1, Some(day(2026, 4, 1)), None, None)];
        let dashboard = Dashboard::build([
            summarize(claim(ClaimStatus::Open), &[], today),
            summarize(claim(ClaimStatus::Open), &future, today),
            summarize(claim(ClaimStatus::Deferred), &future, today),
            summarize(claim(ClaimStatus::Closed), &[], today),
        ]);
        assert_eq!(dashboard.open.len(), 1);
        assert_eq!(dashboard.scheduled.len(), 1);
        assert_eq!(dashboard.deferred.len(), 1);
        assert_eq!(dashboard.closed.len(), 1);
        assert_eq!(dashboard.len(), 4);
    }

    fn arb_status() -> impl Strategy<Value = ClaimStatus> {
        prop::sample::select(ClaimStatus::ALL.to_vec())
    }

    fn arb_dates() -> impl Strategy<Value = Vec<Option<i64>>> {
        prop::collection::vec(prop::option::of(-400_i64..400), 0..8)
    }

    fn orders_from(base: NaiveDate, offsets: &[Option<i64>]) -> Vec<WorkOrder> {
        offsets
            .iter()
            .enumerate()
            .map(|(i, offset)| {
                let id = i64::try_from(i).unwrap_or(i64::MAX);
                order(id, offset.map(|o| base + chrono::Duration::days(o)))
            })
            .collect()
    }

    proptest! {
        #[test]
        fn deferred_and_closed_always_win(status in arb_status(), offsets in arb_dates()) {
            let today = day(2026, 6, 15);
            let orders = orders_from(today, &offsets);
            let derived = effective_status(status, &orders, today);
            if status.requires_reason() {
                prop_assert_eq!(derived, status);
            } else {
                let upcoming = offsets.iter().flatten().any(|o| *o >= 0);
                let expected = if upcoming { ClaimStatus::Scheduled } else { ClaimStatus::Open };
                prop_assert_eq!(derived, expected);
            }
        }

        #[test]
        fn assignment_date_is_the_maximum(offsets in arb_dates()) {
            let base = day(2026, 6, 15);
            let details: Vec<WorkOrderDetail> = orders_from(base, &offsets)
                .into_iter()
                .map(|order| WorkOrderDetail { order, vendor: None, assignee: None })
                .collect();
            let expected = details.iter().filter_map(|d| d.order.scheduled_date).max();
            prop_assert_eq!(current_assignment(&details).scheduled_date, expected);
        }
    }
}
