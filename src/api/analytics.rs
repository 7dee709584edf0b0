use crate::api::allowance::allowances_for_year;
use crate::api::team::team_of;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::leave::analytics::{TimeRange, build_report};
use crate::leave::calendar::{grid_bounds, month_grid, parse_month};
use crate::leave::export::{ExportFormat, ExportRequestRow, file_name, render_csv, render_text_report};
use crate::model::leave_request::{
    DETAIL_SELECT, LeaveRequest, LeaveRequestDetail, LeaveRequestDetailRow, REQUEST_COLUMNS,
};
use crate::utils::leave_type_cache;
use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::info;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    /// `3months`, `6months` (default) or `12months`
    pub time_range: Option<String>,
    /// Allowance year, defaults to the current year
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    /// `csv` (default) or `pdf` (plain-text report)
    pub format: Option<String>,
    pub time_range: Option<String>,
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
pub struct CalendarQuery {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

fn parse_range(raw: Option<&str>) -> ApiResult<TimeRange> {
    match raw {
        None => Ok(TimeRange::default()),
        Some(raw) => TimeRange::from_str(raw).map_err(|_| {
            ApiError::invalid(
                "Invalid time range",
                json!({ "allowed": ["3months", "6months", "12months"] }),
            )
        }),
    }
}

fn parse_format(raw: Option<&str>) -> ApiResult<ExportFormat> {
    match raw {
        None => Ok(ExportFormat::default()),
        Some(raw) => ExportFormat::from_str(raw).map_err(|_| {
            ApiError::invalid("Unsupported export format", json!({ "allowed": ["csv", "pdf"] }))
        }),
    }
}

#[utoipa::path(
    get,
    path = "/api/leave/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Summary, monthly trends, type distribution, cost analysis and team utilization"),
        (status = 400, description = "Invalid time range"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn analytics(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AnalyticsQuery>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let range = parse_range(query.time_range.as_deref())?;
    let now = Utc::now();
    let year = query.year.unwrap_or_else(|| now.year());
    let window = range.window(now);

    let requests = sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests lr WHERE lr.created_at >= ? ORDER BY lr.created_at"
    ))
    .bind(window.start)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch analytics"))?;

    let types = leave_type_cache::all(pool.get_ref()).await?;
    let allowances = allowances_for_year(pool.get_ref(), year)
        .await
        .map_err(ApiError::db("Failed to fetch analytics"))?;

    let report = build_report(
        &requests,
        &types,
        &allowances,
        range,
        year,
        now,
        config.estimated_daily_cost,
    );

    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/leave/analytics/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV or plain-text report download", content_type = "text/csv"),
        (status = 400, description = "Unsupported format or time range"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn export(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExportQuery>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let format = parse_format(query.format.as_deref())?;
    let range = parse_range(query.time_range.as_deref())?;
    let now = Utc::now();
    let year = query.year.unwrap_or_else(|| now.year());
    let window = range.window(now);

    let requests = sqlx::query_as::<_, ExportRequestRow>(
        r#"
        SELECT lr.id, u.name AS user_name, u.email AS user_email, lt.name AS leave_type_name,
               lr.start_date, lr.end_date, lr.total_days, lr.status, lr.reason,
               lr.created_at, lr.approved_at
        FROM leave_requests lr
        INNER JOIN users u ON u.id = lr.user_id
        INNER JOIN leave_types lt ON lt.id = lr.leave_type_id
        WHERE lr.created_at >= ? AND lr.created_at <= ?
        ORDER BY lr.created_at DESC
        "#,
    )
    .bind(window.start)
    .bind(window.end)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to export analytics"))?;

    let allowances = allowances_for_year(pool.get_ref(), year)
        .await
        .map_err(ApiError::db("Failed to export analytics"))?;

    let body = match format {
        ExportFormat::Csv => render_csv(&requests, &allowances, range, year),
        ExportFormat::Pdf => {
            render_text_report(&requests, &allowances, range, year, now.date_naive())
        }
    };

    info!(
        user_id = auth.user_id,
        format = format.as_ref(),
        rows = requests.len(),
        "Analytics exported"
    );

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name(format, range, year)),
        ))
        .body(body))
}

#[utoipa::path(
    get,
    path = "/api/leave/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Sunday-to-Saturday grid of the month with the team's pending and approved leave"),
        (status = 400, description = "Month is not YYYY-MM"),
        (status = 404, description = "User not part of any team")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CalendarQuery>,
) -> ApiResult<impl Responder> {
    let month = match query.month.as_deref() {
        Some(raw) => {
            parse_month(raw).ok_or_else(|| ApiError::bad_request("Month must be in YYYY-MM format"))?
        }
        None => {
            let today = Utc::now().date_naive();
            today.with_day(1).unwrap_or(today)
        }
    };
    let (first, last) = grid_bounds(month);

    let team_id = team_of(pool.get_ref(), auth.user_id)
        .await
        .map_err(ApiError::db("Failed to fetch team"))?
        .ok_or_else(|| ApiError::not_found("User not part of any team"))?;

    let rows = sqlx::query_as::<_, LeaveRequestDetailRow>(&format!(
        r#"{DETAIL_SELECT}
        WHERE lr.user_id IN (SELECT user_id FROM team_members WHERE team_id = ?)
          AND lr.status IN ('pending', 'approved')
          AND lr.start_date <= ? AND lr.end_date >= ?
        ORDER BY lr.start_date, lr.id"#
    ))
    .bind(team_id)
    .bind(last)
    .bind(first)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch team calendar"))?;

    let requests: Vec<LeaveRequestDetail> = rows.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(json!({
        "month": month.format("%Y-%m").to_string(),
        "days": month_grid(month, &requests),
    })))
}
