use chrono::{Datelike, NaiveDate};

use crate::error::{ApiError, ApiResult};

/// Calendar days in `[start, end]`, both ends included.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn validate_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> ApiResult<()> {
    if start < today {
        return Err(ApiError::bad_request("Start date cannot be in the past"));
    }
    if end < start {
        return Err(ApiError::bad_request("End date must be after start date"));
    }
    Ok(())
}

/// Day count charged for a request. Defaults to the full span; an explicit
/// value may shorten it in half-day steps.
pub fn resolve_total_days(
    start: NaiveDate,
    end: NaiveDate,
    requested: Option<f64>,
) -> ApiResult<f64> {
    let span = inclusive_days(start, end) as f64;

    let Some(days) = requested else {
        return Ok(span);
    };

    if !days.is_finite() || days <= 0.0 {
        return Err(ApiError::bad_request("Total days must be greater than zero"));
    }
    if (days * 2.0).fract() != 0.0 {
        return Err(ApiError::bad_request("Total days must be a multiple of 0.5"));
    }
    if days > span {
        return Err(ApiError::bad_request(format!(
            "Total days cannot exceed the {span} days between start and end date"
        )));
    }
    Ok(days)
}

/// Allowance year a request is charged against.
pub fn allowance_year(start: NaiveDate) -> i32 {
    start.year()
}
