use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, EnumString};

use crate::leave::allowance::utilization_rate;
use crate::leave::round1;
use crate::model::leave_allowance::AllowanceWithUserRow;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;

const FALLBACK_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr)]
pub enum TimeRange {
    #[strum(serialize = "3months")]
    ThreeMonths,
    #[default]
    #[strum(serialize = "6months")]
    SixMonths,
    #[strum(serialize = "12months")]
    TwelveMonths,
}

impl TimeRange {
    pub fn months(self) -> u32 {
        match self {
            TimeRange::ThreeMonths => 3,
            TimeRange::SixMonths => 6,
            TimeRange::TwelveMonths => 12,
        }
    }

    /// `[now - months, now]`.
    pub fn window(self, now: DateTime<Utc>) -> Window {
        let start = now
            .checked_sub_months(Months::new(self.months()))
            .unwrap_or(now);
        Window { start, end: now }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

pub fn in_window<'a>(requests: &'a [LeaveRequest], window: &Window) -> Vec<&'a LeaveRequest> {
    requests.iter().filter(|r| window.contains(r.created_at)).collect()
}

fn count_status(requests: &[&LeaveRequest], status: LeaveStatus) -> usize {
    requests.iter().filter(|r| r.status() == Some(status)).count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_requests: usize,
    pub approved_requests: usize,
    pub rejected_requests: usize,
    pub pending_requests: usize,
    pub approval_rate: f64,
    /// Mean days between filing and approval.
    pub average_processing_time: f64,
    pub total_days: f64,
}

pub fn summarize(requests: &[&LeaveRequest]) -> Summary {
    let total_requests = requests.len();
    let approved_requests = count_status(requests, LeaveStatus::Approved);

    let approval_rate = if total_requests > 0 {
        round1(approved_requests as f64 / total_requests as f64 * 100.0)
    } else {
        0.0
    };

    let processing: Vec<f64> = requests
        .iter()
        .filter_map(|r| r.approved_at.map(|at| (at - r.created_at).num_minutes() as f64 / 1440.0))
        .collect();
    let average_processing_time = if processing.is_empty() {
        0.0
    } else {
        round1(processing.iter().sum::<f64>() / processing.len() as f64)
    };

    Summary {
        total_requests,
        approved_requests,
        rejected_requests: count_status(requests, LeaveStatus::Rejected),
        pending_requests: count_status(requests, LeaveStatus::Pending),
        approval_rate,
        average_processing_time,
        total_days: requests.iter().map(|r| r.total_days).sum(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    pub month: String,
    pub requests: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

fn month_start(at: DateTime<Utc>) -> NaiveDate {
    let date = at.date_naive();
    date.with_day(1).unwrap_or(date)
}

/// One bucket per calendar month touched by the window, oldest first.
pub fn monthly_trends(requests: &[&LeaveRequest], window: &Window) -> Vec<MonthlyTrend> {
    let last = month_start(window.end);
    let mut month = month_start(window.start);
    let mut trends = Vec::new();

    while month <= last {
        let bucket: Vec<&LeaveRequest> = requests
            .iter()
            .copied()
            .filter(|r| {
                let created = r.created_at.date_naive();
                created.year() == month.year() && created.month() == month.month()
            })
            .collect();

        trends.push(MonthlyTrend {
            month: month.format("%b %Y").to_string(),
            requests: bucket.len(),
            approved: count_status(&bucket, LeaveStatus::Approved),
            rejected: count_status(&bucket, LeaveStatus::Rejected),
            pending: count_status(&bucket, LeaveStatus::Pending),
        });

        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }

    trends
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    pub name: String,
    pub value: usize,
    pub color: String,
}

/// Requests per leave type. Every known type is listed, zero or not.
pub fn type_distribution(requests: &[&LeaveRequest], types: &[LeaveType]) -> Vec<TypeCount> {
    let mut counts: Vec<TypeCount> = types
        .iter()
        .map(|t| TypeCount {
            name: t.name.clone(),
            value: requests.iter().filter(|r| r.leave_type_id == t.id).count(),
            color: t.color.clone(),
        })
        .collect();

    let unknown = requests
        .iter()
        .filter(|r| !types.iter().any(|t| t.id == r.leave_type_id))
        .count();
    if unknown > 0 {
        counts.push(TypeCount {
            name: "Unknown".to_string(),
            value: unknown,
            color: FALLBACK_COLOR.to_string(),
        });
    }

    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRow {
    pub leave_type: String,
    pub total_days: f64,
    pub estimated_cost: f64,
    pub color: String,
}

/// Estimated cost of approved paid leave, grouped by type in first-seen order.
pub fn cost_analysis(requests: &[&LeaveRequest], types: &[LeaveType], daily_cost: f64) -> Vec<CostRow> {
    let mut rows: Vec<CostRow> = Vec::new();

    for request in requests.iter().filter(|r| r.status() == Some(LeaveStatus::Approved)) {
        let Some(leave_type) = types.iter().find(|t| t.id == request.leave_type_id) else {
            continue;
        };
        if !leave_type.is_paid {
            continue;
        }

        let cost = request.total_days * daily_cost;
        match rows.iter_mut().find(|row| row.leave_type == leave_type.name) {
            Some(row) => {
                row.total_days += request.total_days;
                row.estimated_cost += cost;
            }
            None => rows.push(CostRow {
                leave_type: leave_type.name.clone(),
                total_days: request.total_days,
                estimated_cost: cost,
                color: leave_type.color.clone(),
            }),
        }
    }

    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUtilization {
    pub user_id: u64,
    pub name: String,
    pub email: String,
    pub total_days: f64,
    pub used_days: f64,
    pub carried_over: f64,
    pub remaining_days: f64,
    pub utilization_rate: f64,
}

pub fn team_utilization(allowances: &[AllowanceWithUserRow]) -> Vec<MemberUtilization> {
    allowances
        .iter()
        .map(|a| MemberUtilization {
            user_id: a.user_id,
            name: a.user_name.clone().unwrap_or_else(|| "Unknown".to_string()),
            email: a.user_email.clone(),
            total_days: a.total_days,
            used_days: a.used_days,
            carried_over: a.carried_over,
            remaining_days: a.total_days + a.carried_over - a.used_days,
            utilization_rate: utilization_rate(a.total_days, a.carried_over, a.used_days),
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub time_range: String,
    pub year: i32,
    pub summary: Summary,
    pub monthly_trends: Vec<MonthlyTrend>,
    pub type_distribution: Vec<TypeCount>,
    pub cost_analysis: Vec<CostRow>,
    pub team_utilization: Vec<MemberUtilization>,
}

pub fn build_report(
    requests: &[LeaveRequest],
    types: &[LeaveType],
    allowances: &[AllowanceWithUserRow],
    range: TimeRange,
    year: i32,
    now: DateTime<Utc>,
    daily_cost: f64,
) -> AnalyticsReport {
    let window = range.window(now);
    let filtered = in_window(requests, &window);

    AnalyticsReport {
        time_range: range.as_ref().to_string(),
        year,
        summary: summarize(&filtered),
        monthly_trends: monthly_trends(&filtered, &window),
        type_distribution: type_distribution(&filtered, types),
        cost_analysis: cost_analysis(&filtered, types, daily_cost),
        team_utilization: team_utilization(allowances),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn request(id: u64, type_id: u64, status: LeaveStatus, days_ago: i64, total_days: f64) -> LeaveRequest {
        let created_at = now() - Duration::days(days_ago);
        LeaveRequest {
            id,
            user_id: 7,
            leave_type_id: type_id,
            start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 6).unwrap(),
            total_days,
            reason: None,
            status: status.as_ref().to_string(),
            approved_by: None,
            approved_at: (status == LeaveStatus::Approved).then(|| created_at + Duration::hours(36)),
            rejection_reason: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn leave_type(id: u64, name: &str, is_paid: bool) -> LeaveType {
        LeaveType {
            id,
            name: name.to_string(),
            color: "#10B981".to_string(),
            is_paid,
            requires_approval: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn time_range_parses_the_query_values() {
        assert_eq!("3months".parse::<TimeRange>().unwrap(), TimeRange::ThreeMonths);
        assert_eq!("12months".parse::<TimeRange>().unwrap(), TimeRange::TwelveMonths);
        assert!("2weeks".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::default().as_ref(), "6months");
    }

    #[test]
    fn window_excludes_older_requests() {
        let requests = vec![
            request(1, 1, LeaveStatus::Approved, 10, 2.0),
            request(2, 1, LeaveStatus::Pending, 200, 1.0),
        ];
        let window = TimeRange::ThreeMonths.window(now());
        let filtered = in_window(&requests, &window);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn summary_counts_statuses_and_processing_time() {
        let requests = vec![
            request(1, 1, LeaveStatus::Approved, 5, 2.0),
            request(2, 1, LeaveStatus::Approved, 6, 3.0),
            request(3, 2, LeaveStatus::Rejected, 7, 1.0),
            request(4, 2, LeaveStatus::Pending, 8, 1.5),
        ];
        let refs: Vec<&LeaveRequest> = requests.iter().collect();
        let summary = summarize(&refs);

        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.approved_requests, 2);
        assert_eq!(summary.rejected_requests, 1);
        assert_eq!(summary.pending_requests, 1);
        assert_eq!(summary.approval_rate, 50.0);
        assert_eq!(summary.average_processing_time, 1.5);
        assert_eq!(summary.total_days, 7.5);

        let empty = summarize(&[]);
        assert_eq!(empty.approval_rate, 0.0);
        assert_eq!(empty.average_processing_time, 0.0);
    }

    #[test]
    fn monthly_trends_cover_every_month_of_the_window() {
        let requests = vec![
            request(1, 1, LeaveStatus::Approved, 1, 1.0),
            request(2, 1, LeaveStatus::Rejected, 40, 1.0),
        ];
        let window = TimeRange::ThreeMonths.window(now());
        let filtered = in_window(&requests, &window);
        let trends = monthly_trends(&filtered, &window);

        let labels: Vec<&str> = trends.iter().map(|t| t.month.as_str()).collect();
        assert_eq!(labels, ["Jul 2026", "Aug 2026", "Sep 2026", "Oct 2026"]);
        assert_eq!(trends[3].approved, 1);
        assert_eq!(trends[2].rejected, 1);
        assert_eq!(trends[0].requests, 0);
    }

    #[test]
    fn distribution_lists_unused_and_unknown_types() {
        let types = vec![leave_type(1, "Annual Leave", true), leave_type(2, "Sick Leave", true)];
        let requests = vec![
            request(1, 1, LeaveStatus::Pending, 1, 1.0),
            request(2, 9, LeaveStatus::Pending, 1, 1.0),
        ];
        let refs: Vec<&LeaveRequest> = requests.iter().collect();
        let dist = type_distribution(&refs, &types);

        assert_eq!(dist.len(), 3);
        assert_eq!((dist[0].name.as_str(), dist[0].value), ("Annual Leave", 1));
        assert_eq!((dist[1].name.as_str(), dist[1].value), ("Sick Leave", 0));
        assert_eq!((dist[2].name.as_str(), dist[2].value), ("Unknown", 1));
    }

    #[test]
    fn costs_only_count_approved_paid_leave() {
        let types = vec![leave_type(1, "Annual Leave", true), leave_type(2, "Unpaid Leave", false)];
        let requests = vec![
            request(1, 1, LeaveStatus::Approved, 1, 2.0),
            request(2, 1, LeaveStatus::Approved, 2, 1.5),
            request(3, 1, LeaveStatus::Pending, 3, 4.0),
            request(4, 2, LeaveStatus::Approved, 4, 5.0),
        ];
        let refs: Vec<&LeaveRequest> = requests.iter().collect();
        let costs = cost_analysis(&refs, &types, 150.0);

        assert_eq!(costs.len(), 1);
        assert_eq!(costs[0].leave_type, "Annual Leave");
        assert_eq!(costs[0].total_days, 3.5);
        assert_eq!(costs[0].estimated_cost, 525.0);
    }

    #[test]
    fn utilization_reports_remaining_budget() {
        let rows = vec![AllowanceWithUserRow {
            id: 1,
            user_id: 7,
            year: 2026,
            total_days: 25.0,
            used_days: 10.0,
            carried_over: 5.0,
            created_at: now(),
            updated_at: now(),
            user_name: None,
            user_email: "jane@company.com".into(),
            user_role: "member".into(),
        }];
        let members = team_utilization(&rows);

        assert_eq!(members[0].name, "Unknown");
        assert_eq!(members[0].remaining_days, 20.0);
        assert_eq!(members[0].utilization_rate, 33.3);
    }
}
