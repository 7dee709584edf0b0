use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

use crate::model::leave_request::LeaveRequestDetail;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarLeave {
    pub request_id: u64,
    pub user_id: u64,
    pub user_name: Option<String>,
    pub leave_type_id: u64,
    pub leave_type: String,
    pub color: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
    pub leaves: Vec<CalendarLeave>,
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok()
}

/// First and last day of the Sunday-to-Saturday grid that covers `month`.
pub fn grid_bounds(month: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = month.with_day(1).unwrap_or(month);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);

    let start = first - Days::new(u64::from(first.weekday().num_days_from_sunday()));
    let end = last + Days::new(u64::from(6 - last.weekday().num_days_from_sunday()));
    (start, end)
}

pub fn month_grid(month: NaiveDate, requests: &[LeaveRequestDetail]) -> Vec<CalendarDay> {
    let (start, end) = grid_bounds(month);

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| CalendarDay {
            date,
            in_month: date.year() == month.year() && date.month() == month.month(),
            leaves: requests
                .iter()
                .filter(|d| d.request.start_date <= date && date <= d.request.end_date)
                .map(|d| CalendarLeave {
                    request_id: d.request.id,
                    user_id: d.user.id,
                    user_name: d.user.name.clone(),
                    leave_type_id: d.leave_type.id,
                    leave_type: d.leave_type.name.clone(),
                    color: d.leave_type.color.clone(),
                    status: d.request.status.clone(),
                })
                .collect(),
        })
        .collect()
}
