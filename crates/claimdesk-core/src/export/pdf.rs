//! Single-page PDF work-order sheet.
//!
//! A tiny PDF 1.4 writer: one Letter page, the two standard Helvetica
//! faces, absolute-positioned text runs, and a byte-exact xref table.

use std::fmt::Write as _;

use super::or_na;
use crate::model::{Claim, WorkOrderDetail};

const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const LEFT_MARGIN: i32 = 72;
const TITLE_Y: i32 = 720;
const FIRST_LINE_Y: i32 = 700;
const LINE_SPACING: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextRun {
    font: Font,
    size: u32,
    x: i32,
    y: i32,
    text: String,
}

/// Text lines printed under the title, in order.
#[must_use]
pub fn workorder_lines(claim: &Claim, detail: &WorkOrderDetail) -> Vec<String> {
    let order = &detail.order;
    let vendor = detail.vendor.as_ref();
    let assignee = detail.assignee.as_ref();
    let blank = |v: Option<&str>| v.unwrap_or_default().to_string();

    vec![
        format!("Claim ID: {}", claim.id),
        format!("Address: {}", claim.address),
        format!("Homeowner: {}", blank(claim.homeowner_name.as_deref())),
        format!("Warranty Type: {}", blank(claim.warranty_type.as_deref())),
        format!("Issue: {}", blank(claim.issue_description.as_deref())),
        format!("Date Reported: {}", claim.date_reported.format("%Y-%m-%d")),
        String::new(),
        format!("Assigned Vendor: {}", or_na(vendor.map(|v| v.name.as_str()))),
        format!("Vendor Contact: {}", or_na(vendor.and_then(|v| v.contact_number.as_deref()))),
        format!("Vendor Email: {}", or_na(vendor.and_then(|v| v.email.as_deref()))),
        String::new(),
        format!("Assigned Assignee: {}", or_na(assignee.map(|a| a.name.as_str()))),
        format!("Assignee Contact: {}", or_na(assignee.and_then(|a| a.contact_number.as_deref()))),
        format!("Assignee Email: {}", or_na(assignee.and_then(|a| a.email.as_deref()))),
        String::new(),
        format!(
            "Scheduled Date: {}",
            order
                .scheduled_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        ),
        format!(
            "Scheduled Time: {}",
            order
                .scheduled_time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default()
        ),
        format!("Notes: {}", blank(order.notes.as_deref())),
        format!("Status: {}", order.status),
    ]
}

/// Render the work-order sheet as PDF bytes.
#[must_use]
pub fn workorder_sheet(claim: &Claim, detail: &WorkOrderDetail) -> Vec<u8> {
    let mut runs = vec![TextRun {
        font: Font::Bold,
        size: 16,
        x: LEFT_MARGIN,
        y: TITLE_Y,
        text: "Work Order".to_string(),
    }];
    let mut y = FIRST_LINE_Y;
    for line in workorder_lines(claim, detail) {
        runs.push(TextRun {
            font: Font::Regular,
            size: 12,
            x: LEFT_MARGIN,
            y,
            text: line,
        });
        y -= LINE_SPACING;
    }
    render_page(&runs)
}

fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn content_stream(runs: &[TextRun]) -> String {
    let mut stream = String::new();
    for run in runs.iter().filter(|r| !r.text.is_empty()) {
        let _ = writeln!(
            stream,
            "BT /{} {} Tf {} {} Td ({}) Tj ET",
            run.font.resource(),
            run.size,
            run.x,
            run.y,
            escape_pdf_string(&run.text)
        );
    }
    stream
}

fn render_page(runs: &[TextRun]) -> Vec<u8> {
    let stream = content_stream(runs);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 5 0 R /F2 6 0 R >> >> /Contents 4 0 R >>"
        ),
        format!("<< /Length {} >>\nstream\n{stream}endstream", stream.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >>".to_string(),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = write!(out, "{} 0 obj\n{body}\nendobj\n", index + 1);
    }

    let xref_offset = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(out, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    );
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClaimStatus, Contact, WorkOrder};
    use chrono::{NaiveDate, NaiveTime};

    fn fixtures() -> (Claim, WorkOrderDetail) {
        let claim = Claim {
            id: 42,
            address: "9 Oak Ct".to_string(),
            homeowner_name: Some("Lee (Owner)".to_string()),
            homeowner_email: None,
            homeowner_phone: None,
            cobuyer_name: None,
            cobuyer_email: None,
            cobuyer_phone: None,
            warranty_type: None,
            issue_description: Some("Cracked tile".to_string()),
            status: ClaimStatus::Scheduled,
            date_reported: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
        };
        let detail = WorkOrderDetail {
            order: WorkOrder {
                id: 1,
                claim_id: 42,
                vendor_id: Some(1),
                assignee_id: None,
                scheduled_date: NaiveDate::from_ymd_opt(2026, 5, 20),
                scheduled_time: NaiveTime::from_hms_opt(13, 0, 0),
                status: "Scheduled".to_string(),
                notes: None,
                created_at_us: 0,
            },
            vendor: Some(Contact {
                id: 1,
                name: "Tile Pros".to_string(),
                contact_number: None,
                email: Some("tile@example.com".to_string()),
            }),
            assignee: None,
        };
        (claim, detail)
    }

    #[test]
    fn lines_follow_the_sheet_layout() {
        let (claim, detail) = fixtures();
        let lines = workorder_lines(&claim, &detail);
        assert_eq!(lines.len(), 19);
        assert_eq!(lines[0], "Claim ID: 42");
        assert_eq!(lines[3], "Warranty Type: ");
        assert_eq!(lines[5], "Date Reported: 2026-05-04");
        assert_eq!(lines[7], "Assigned Vendor: Tile Pros");
        assert_eq!(lines[8], "Vendor Contact: N/A");
        assert_eq!(lines[11], "Assigned Assignee: N/A");
        assert_eq!(lines[16], "Scheduled Time: 13:00");
        assert_eq!(lines[18], "Status: Scheduled");
    }

    #[test]
    fn sheet_is_a_well_formed_single_page() {
        let (claim, detail) = fixtures();
        let bytes = workorder_sheet(&claim, &detail);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/MediaBox [0 0 612 792]"));
        assert!(text.contains("BT /F2 16 Tf 72 720 Td (Work Order) Tj ET"));
        assert!(text.contains("BT /F1 12 Tf 72 700 Td (Claim ID: 42) Tj ET"));
        assert!(text.contains("(Homeowner: Lee \\(Owner\\)) Tj"));
        // Status is the 19th line: 700 - 18 * 20.
        assert!(text.contains("72 340 Td (Status: Scheduled)"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let (claim, detail) = fixtures();
        let text = String::from_utf8(workorder_sheet(&claim, &detail)).unwrap();
        let start: usize = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .unwrap()
            .parse()
            .unwrap();
        assert!(text[start..].starts_with("xref\n0 7\n"));

        let entries: Vec<usize> = text[start..]
            .lines()
            .skip(3)
            .take(6)
            .map(|l| l[..10].parse().unwrap())
            .collect();
        for (index, offset) in entries.iter().enumerate() {
            assert!(text[*offset..].starts_with(&format!("{} 0 obj", index + 1)));
        }
    }

    #[test]
    fn non_ascii_is_replaced() {
        assert_eq!(escape_pdf_string("caf\u{e9} \\"), "caf? \\\\");
    }
}
