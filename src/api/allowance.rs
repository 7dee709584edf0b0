use crate::api::company_settings::fetch_settings;
use crate::api::parse_id;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::leave::allowance::{AllowanceView, opening_balance, remaining, utilization_rate};
use crate::model::leave_allowance::{AllowanceWithUserRow, LeaveAllowance};
use crate::model::user::UserSummary;
use crate::utils::db_utils::{Column, ColumnKind, build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const ALLOWANCE_SELECT: &str = r#"
    SELECT id, user_id, year, total_days, used_days, carried_over, created_at, updated_at
    FROM leave_allowances
"#;

const ALLOWANCE_COLUMNS: [Column; 2] = [
    Column::new("totalDays", "total_days", ColumnKind::Days),
    Column::new("carriedOver", "carried_over", ColumnKind::Days),
];

async fn find_allowance(
    conn: &mut MySqlConnection,
    user_id: u64,
    year: i32,
) -> Result<Option<LeaveAllowance>, sqlx::Error> {
    sqlx::query_as::<_, LeaveAllowance>(&format!(
        "{ALLOWANCE_SELECT} WHERE user_id = ? AND year = ?"
    ))
    .bind(user_id)
    .bind(year)
    .fetch_optional(&mut *conn)
    .await
}

/// Allowance row for `(user_id, year)`, created from the opening-balance rule
/// when missing. Safe to race: the unique key keeps one row.
pub async fn ensure_allowance(
    conn: &mut MySqlConnection,
    user_id: u64,
    year: i32,
) -> Result<LeaveAllowance, sqlx::Error> {
    if let Some(existing) = find_allowance(conn, user_id, year).await? {
        return Ok(existing);
    }

    let settings = fetch_settings(&mut *conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let previous = find_allowance(conn, user_id, year - 1).await?;
    let opening = opening_balance(&settings, previous.as_ref());

    sqlx::query(
        r#"
        INSERT IGNORE INTO leave_allowances (user_id, year, total_days, used_days, carried_over)
        VALUES (?, ?, ?, 0, ?)
        "#,
    )
    .bind(user_id)
    .bind(year)
    .bind(opening.total_days)
    .bind(opening.carried_over)
    .execute(&mut *conn)
    .await?;

    info!(user_id, year, carried_over = opening.carried_over, "Allowance opened");

    find_allowance(conn, user_id, year)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

#[utoipa::path(
    get,
    path = "/api/leave/allowance",
    responses(
        (status = 200, description = "Caller's allowance for the current year, with remainingDays and utilizationRate", body = LeaveAllowance),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn my_allowance(auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    let mut conn = pool
        .acquire()
        .await
        .map_err(ApiError::db("Failed to fetch leave allowance"))?;

    let allowance = ensure_allowance(&mut conn, auth.user_id, Utc::now().year())
        .await
        .map_err(ApiError::db("Failed to fetch leave allowance"))?;

    Ok(HttpResponse::Ok().json(AllowanceView::from(allowance)))
}

#[derive(Deserialize, IntoParams)]
pub struct YearQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceWithUser {
    #[serde(flatten)]
    pub allowance: LeaveAllowance,
    pub remaining_days: f64,
    pub utilization_rate: f64,
    pub user: UserSummary,
}

impl From<AllowanceWithUserRow> for AllowanceWithUser {
    fn from(row: AllowanceWithUserRow) -> Self {
        let allowance = LeaveAllowance {
            id: row.id,
            user_id: row.user_id,
            year: row.year,
            total_days: row.total_days,
            used_days: row.used_days,
            carried_over: row.carried_over,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        Self {
            remaining_days: remaining(&allowance),
            utilization_rate: utilization_rate(row.total_days, row.carried_over, row.used_days),
            user: UserSummary {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
                role: row.user_role,
            },
            allowance,
        }
    }
}

/// Every allowance of `year` joined with its owner, by user name.
pub async fn allowances_for_year(
    pool: &MySqlPool,
    year: i32,
) -> Result<Vec<AllowanceWithUserRow>, sqlx::Error> {
    sqlx::query_as::<_, AllowanceWithUserRow>(
        r#"
        SELECT la.id, la.user_id, la.year, la.total_days, la.used_days, la.carried_over,
               la.created_at, la.updated_at,
               u.name AS user_name, u.email AS user_email, u.role AS user_role
        FROM leave_allowances la
        INNER JOIN users u ON u.id = la.user_id
        WHERE la.year = ? AND u.deleted_at IS NULL
        ORDER BY u.name ASC, u.email ASC
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await
}

#[utoipa::path(
    get,
    path = "/api/leave/allowances",
    params(YearQuery),
    responses(
        (status = 200, description = "All allowances of the year with user details", body = [AllowanceWithUser]),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn list_allowances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<YearQuery>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let rows = allowances_for_year(pool.get_ref(), year)
        .await
        .map_err(ApiError::db("Failed to fetch leave allowances"))?;

    let allowances: Vec<AllowanceWithUser> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(allowances))
}

#[utoipa::path(
    put,
    path = "/api/leave/allowances/{id}",
    params(("id" = u64, Path, description = "Allowance id")),
    request_body(content = Object, description = "totalDays and/or carriedOver, non-negative half days"),
    responses(
        (status = 200, description = "Updated allowance", body = LeaveAllowance),
        (status = 400, description = "Invalid id or value"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Allowance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn update_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let id = parse_id(&path, "Invalid allowance ID")?;
    let update = build_update_sql("leave_allowances", &ALLOWANCE_COLUMNS, &payload, "id", id)?;

    let lookup = format!("{ALLOWANCE_SELECT} WHERE id = ?");
    let exists = sqlx::query_as::<_, LeaveAllowance>(&lookup)
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch leave allowance"))?
        .is_some();
    if !exists {
        return Err(ApiError::not_found("Leave allowance not found"));
    }

    execute_update(pool.get_ref(), update)
        .await
        .map_err(ApiError::db("Failed to update leave allowance"))?;

    let allowance = sqlx::query_as::<_, LeaveAllowance>(&lookup)
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch leave allowance"))?;

    info!(allowance_id = id, updated_by = auth.user_id, "Allowance adjusted");

    Ok(HttpResponse::Ok().json(AllowanceView::from(allowance)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{app_data, bearer, peer};
    use crate::model::role::Role;
    use actix_web::{App, http::StatusCode, test::{self}};
    use serde_json::json;

    #[actix_web::test]
    async fn allowance_updates_are_validated_before_any_query() {
        let (pool, config, _, _) = app_data();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(config)
                .route("/allowances/{id}", web::put().to(update_allowance)),
        )
        .await;

        for (uri, body) in [
            ("/allowances/abc", json!({ "totalDays": 20 })),
            ("/allowances/3", json!({ "totalDays": -2 })),
            ("/allowances/3", json!({ "usedDays": 1 })),
        ] {
            let req = test::TestRequest::put()
                .uri(uri)
                .peer_addr(peer())
                .insert_header(bearer(Role::Admin))
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[actix_web::test]
    async fn member_cannot_list_allowances() {
        let (pool, config, _, _) = app_data();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(config)
                .route("/allowances", web::get().to(list_allowances)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/allowances?year=2026")
            .peer_addr(peer())
            .insert_header(bearer(Role::Member))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
