use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};
use strum_macros::{AsRefStr, EnumString};

use crate::leave::allowance::utilization_rate;
use crate::leave::analytics::TimeRange;
use crate::leave::round1;
use crate::model::leave_allowance::AllowanceWithUserRow;
use crate::model::leave_request::LeaveStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    /// Plain-text report.
    Pdf,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Pdf => "text/plain",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "txt",
        }
    }
}

pub fn file_name(format: ExportFormat, range: TimeRange, year: i32) -> String {
    format!(
        "leave-analytics-{}-{}.{}",
        range.as_ref(),
        year,
        format.extension()
    )
}

/// Request row as exported, joined with requester and type names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExportRequestRow {
    pub id: u64,
    pub user_name: Option<String>,
    pub user_email: String,
    pub leave_type_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: f64,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

struct Totals {
    requests: usize,
    approved: usize,
    approval_rate: f64,
    days: f64,
}

fn totals(requests: &[ExportRequestRow]) -> Totals {
    let approved = requests
        .iter()
        .filter(|r| r.status == LeaveStatus::Approved.as_ref())
        .count();
    let approval_rate = if requests.is_empty() {
        0.0
    } else {
        round1(approved as f64 / requests.len() as f64 * 100.0)
    };
    Totals {
        requests: requests.len(),
        approved,
        approval_rate,
        days: requests.iter().map(|r| r.total_days).sum(),
    }
}

pub fn render_csv(
    requests: &[ExportRequestRow],
    allowances: &[AllowanceWithUserRow],
    range: TimeRange,
    year: i32,
) -> String {
    let mut out = String::new();

    out.push_str("LEAVE REQUESTS\n");
    out.push_str("ID,Employee Name,Email,Leave Type,Start Date,End Date,Total Days,Status,Reason,Created Date,Approved Date\n");
    for r in requests {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            r.id,
            quoted(r.user_name.as_deref().unwrap_or("")),
            quoted(&r.user_email),
            quoted(&r.leave_type_name),
            quoted(&r.start_date.to_string()),
            quoted(&r.end_date.to_string()),
            quoted(&r.total_days.to_string()),
            quoted(&r.status),
            quoted(r.reason.as_deref().unwrap_or("")),
            quoted(&r.created_at.to_rfc3339()),
            quoted(&r.approved_at.map(|at| at.to_rfc3339()).unwrap_or_default()),
        );
    }

    out.push_str("\n\nLEAVE ALLOWANCES\n");
    out.push_str("Employee Name,Email,Year,Total Days,Used Days,Remaining Days,Utilization Rate (%)\n");
    for a in allowances {
        let remaining = a.total_days + a.carried_over - a.used_days;
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            quoted(a.user_name.as_deref().unwrap_or("")),
            quoted(&a.user_email),
            quoted(&a.year.to_string()),
            quoted(&a.total_days.to_string()),
            quoted(&a.used_days.to_string()),
            quoted(&remaining.to_string()),
            quoted(&format!("{:.1}", utilization_rate(a.total_days, a.carried_over, a.used_days))),
        );
    }

    let t = totals(requests);
    out.push_str("\n\nSUMMARY STATISTICS\n");
    let _ = writeln!(out, "Time Range,{}", range.as_ref());
    let _ = writeln!(out, "Year,{year}");
    let _ = writeln!(out, "Total Requests,{}", t.requests);
    let _ = writeln!(out, "Approved Requests,{}", t.approved);
    let _ = writeln!(out, "Approval Rate,{:.1}%", t.approval_rate);
    let _ = writeln!(out, "Total Leave Days,{}", t.days);

    out
}

/// The "pdf" export: a plain-text report.
pub fn render_text_report(
    requests: &[ExportRequestRow],
    allowances: &[AllowanceWithUserRow],
    range: TimeRange,
    year: i32,
    generated_on: NaiveDate,
) -> String {
    let t = totals(requests);
    let mut out = String::new();

    out.push_str("LEAVE ANALYTICS REPORT\n");
    let _ = writeln!(out, "Generated on: {generated_on}");
    let _ = writeln!(out, "Time Range: {}", range.as_ref());
    let _ = writeln!(out, "Year: {year}\n");

    out.push_str("SUMMARY\n");
    let _ = writeln!(out, "Total Leave Requests: {}", t.requests);
    let _ = writeln!(out, "Approved Requests: {}", t.approved);
    let _ = writeln!(out, "Approval Rate: {:.1}%", t.approval_rate);
    let _ = writeln!(out, "Total Leave Days: {}\n", t.days);

    out.push_str("BY LEAVE TYPE\n");
    let mut by_type: Vec<(&str, usize, f64)> = Vec::new();
    for r in requests {
        match by_type.iter_mut().find(|(name, _, _)| *name == r.leave_type_name) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += r.total_days;
            }
            None => by_type.push((r.leave_type_name.as_str(), 1, r.total_days)),
        }
    }
    if by_type.is_empty() {
        out.push_str("No requests in this period\n");
    }
    for (name, count, days) in by_type {
        let _ = writeln!(out, "{name}: {count} requests, {days} days");
    }

    out.push_str("\nALLOWANCES\n");
    for a in allowances {
        let remaining = a.total_days + a.carried_over - a.used_days;
        let _ = writeln!(
            out,
            "{} <{}>: {} of {} days used, {} remaining",
            a.user_name.as_deref().unwrap_or("Unknown"),
            a.user_email,
            a.used_days,
            a.total_days + a.carried_over,
            remaining
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: u64, status: &str, total_days: f64, reason: Option<&str>) -> ExportRequestRow {
        ExportRequestRow {
            id,
            user_name: Some("Jane Doe".into()),
            user_email: "jane@company.com".into(),
            leave_type_name: "Annual Leave".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            total_days,
            status: status.into(),
            reason: reason.map(Into::into),
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap(),
            approved_at: None,
        }
    }

    fn allowance_row() -> AllowanceWithUserRow {
        AllowanceWithUserRow {
            id: 1,
            user_id: 7,
            year: 2026,
            total_days: 25.0,
            used_days: 5.0,
            carried_over: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user_name: Some("Jane Doe".into()),
            user_email: "jane@company.com".into(),
            user_role: "member".into(),
        }
    }

    #[test]
    fn csv_has_three_sections_and_escapes_quotes() {
        let requests = vec![
            row(1, "approved", 2.0, Some("Visiting \"home\"")),
            row(2, "pending", 1.0, None),
        ];
        let csv = render_csv(&requests, &[allowance_row()], TimeRange::SixMonths, 2026);

        assert!(csv.starts_with("LEAVE REQUESTS\nID,Employee Name,"));
        assert!(csv.contains("\"Visiting \"\"home\"\"\""));
        assert!(csv.contains("\n\nLEAVE ALLOWANCES\n"));
        assert!(csv.contains("\"Jane Doe\",\"jane@company.com\",\"2026\",\"25\",\"5\",\"20\",\"20.0\""));
        assert!(csv.contains("Approval Rate,50.0%\n"));
        assert!(csv.ends_with("Total Leave Days,3\n"));
    }

    #[test]
    fn text_report_groups_by_type() {
        let requests = vec![row(1, "approved", 2.0, None), row(2, "approved", 1.5, None)];
        let report = render_text_report(
            &requests,
            &[allowance_row()],
            TimeRange::ThreeMonths,
            2026,
            NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
        );

        assert!(report.starts_with("LEAVE ANALYTICS REPORT\nGenerated on: 2026-10-14\n"));
        assert!(report.contains("Approval Rate: 100.0%"));
        assert!(report.contains("Annual Leave: 2 requests, 3.5 days"));
        assert!(report.contains("Jane Doe <jane@company.com>: 5 of 25 days used, 20 remaining"));
    }

    #[test]
    fn file_names_follow_the_format() {
        assert_eq!(
            file_name(ExportFormat::Pdf, TimeRange::TwelveMonths, 2025),
            "leave-analytics-12months-2025.txt"
        );
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
