use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::company_settings::CompanySettings;
use crate::utils::db_utils::{Column, ColumnKind, build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{Executor, MySql, MySqlPool};
use tracing::info;

const SETTINGS_COLUMNS: [Column; 6] = [
    Column::new("companyName", "company_name", ColumnKind::Text),
    Column::new("defaultAnnualLeaveDays", "default_annual_leave_days", ColumnKind::Count),
    Column::new("allowCarryOver", "allow_carry_over", ColumnKind::Bool),
    Column::new("maxCarryOverDays", "max_carry_over_days", ColumnKind::Count),
    Column::new("fiscalYearStart", "fiscal_year_start", ColumnKind::Text),
    Column::new("workingDays", "working_days", ColumnKind::Count),
];

/// The single settings row, if seeded.
pub async fn fetch_settings<'e, E>(executor: E) -> Result<Option<CompanySettings>, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query_as::<_, CompanySettings>(
        r#"
        SELECT id, company_name, default_annual_leave_days, allow_carry_over,
               max_carry_over_days, fiscal_year_start, working_days, created_at, updated_at
        FROM company_settings
        ORDER BY id ASC
        LIMIT 1
        "#,
    )
    .fetch_optional(executor)
    .await
}

/// `MM-DD` naming a real day; 02-29 is accepted.
pub fn is_valid_fiscal_start(value: &str) -> bool {
    value.len() == 5
        && value.as_bytes()[2] == b'-'
        && NaiveDate::parse_from_str(&format!("2024-{value}"), "%Y-%m-%d").is_ok()
}

fn validate(payload: &Value) -> ApiResult<()> {
    if let Some(value) = payload.get("fiscalYearStart") {
        let valid = value.as_str().is_some_and(is_valid_fiscal_start);
        if !valid {
            return Err(ApiError::bad_request("fiscalYearStart must be in MM-DD format"));
        }
    }
    if let Some(days) = payload.get("workingDays").and_then(Value::as_i64) {
        if days < 1 {
            return Err(ApiError::bad_request("workingDays must be at least 1"));
        }
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/company/settings",
    responses(
        (status = 200, description = "Company leave settings", body = CompanySettings),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Settings not initialised")
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn get_settings(_auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    let settings = fetch_settings(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch company settings"))?
        .ok_or_else(|| ApiError::not_found("Company settings not found"))?;

    Ok(HttpResponse::Ok().json(settings))
}

#[utoipa::path(
    put,
    path = "/api/company/settings",
    request_body(content = Object, description = "Any subset of companyName, defaultAnnualLeaveDays, allowCarryOver, maxCarryOverDays, fiscalYearStart, workingDays"),
    responses(
        (status = 200, description = "Updated settings", body = CompanySettings),
        (status = 400, description = "Invalid field value"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn update_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<Value>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    validate(&payload)?;

    let current = fetch_settings(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch company settings"))?
        .ok_or_else(|| ApiError::not_found("Company settings not found"))?;

    let update = build_update_sql("company_settings", &SETTINGS_COLUMNS, &payload, "id", current.id)?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(ApiError::db("Failed to update company settings"))?;

    let settings = fetch_settings(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch company settings"))?
        .ok_or_else(|| ApiError::not_found("Company settings not found"))?;

    info!(updated_by = auth.user_id, "Company settings updated");

    Ok(HttpResponse::Ok().json(settings))
}
