use crate::api::parse_id;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::leave_policy::LeavePolicy;
use crate::utils::db_utils::{Column, ColumnKind, build_update_sql, execute_update};
use crate::utils::leave_type_cache;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

pub const POLICY_SELECT: &str = r#"
    SELECT id, name, description, leave_type_id, min_notice_days, max_consecutive_days,
           max_requests_per_year, requires_approval, is_active, created_at, updated_at
    FROM leave_policies
"#;

const POLICY_COLUMNS: [Column; 8] = [
    Column::new("name", "name", ColumnKind::Text),
    Column::new("description", "description", ColumnKind::NullableText),
    Column::new("leaveTypeId", "leave_type_id", ColumnKind::NullableId),
    Column::new("minNoticeDays", "min_notice_days", ColumnKind::Count),
    Column::new("maxConsecutiveDays", "max_consecutive_days", ColumnKind::NullableCount),
    Column::new("maxRequestsPerYear", "max_requests_per_year", ColumnKind::NullableCount),
    Column::new("requiresApproval", "requires_approval", ColumnKind::Bool),
    Column::new("isActive", "is_active", ColumnKind::Bool),
];

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicy {
    #[schema(example = "Annual leave notice")]
    pub name: String,
    pub description: Option<String>,
    /// Omit to apply to every leave type
    pub leave_type_id: Option<u64>,
    #[serde(default)]
    #[schema(example = 14)]
    pub min_notice_days: i32,
    pub max_consecutive_days: Option<i32>,
    pub max_requests_per_year: Option<i32>,
    #[serde(default = "default_true")]
    pub requires_approval: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn validate_create(payload: &CreatePolicy) -> ApiResult<()> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Policy name is required"));
    }
    if payload.min_notice_days < 0 {
        return Err(ApiError::bad_request("minNoticeDays cannot be negative"));
    }
    if payload.max_consecutive_days.is_some_and(|d| d < 1) {
        return Err(ApiError::bad_request("maxConsecutiveDays must be at least 1"));
    }
    if payload.max_requests_per_year.is_some_and(|n| n < 1) {
        return Err(ApiError::bad_request("maxRequestsPerYear must be at least 1"));
    }
    Ok(())
}

/// Zero would forbid every request, so limits start at one.
fn validate_update(payload: &Value) -> ApiResult<()> {
    for field in ["maxConsecutiveDays", "maxRequestsPerYear"] {
        if payload.get(field).and_then(Value::as_i64) == Some(0) {
            return Err(ApiError::bad_request(format!("{field} must be at least 1")));
        }
    }
    Ok(())
}

async fn ensure_leave_type(pool: &MySqlPool, leave_type_id: Option<u64>) -> ApiResult<()> {
    if let Some(id) = leave_type_id {
        if leave_type_cache::find(pool, id).await?.is_none() {
            return Err(ApiError::bad_request("Leave type not found"));
        }
    }
    Ok(())
}

async fn fetch_policy(pool: &MySqlPool, id: u64) -> ApiResult<LeavePolicy> {
    sqlx::query_as::<_, LeavePolicy>(&format!("{POLICY_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(ApiError::db("Failed to fetch leave policy"))?
        .ok_or_else(|| ApiError::not_found("Leave policy not found"))
}

/// Active policies that apply to `leave_type_id`.
pub async fn applicable_policies(
    pool: &MySqlPool,
    leave_type_id: u64,
) -> Result<Vec<LeavePolicy>, sqlx::Error> {
    sqlx::query_as::<_, LeavePolicy>(&format!(
        "{POLICY_SELECT} WHERE is_active = TRUE AND (leave_type_id IS NULL OR leave_type_id = ?) ORDER BY id"
    ))
    .bind(leave_type_id)
    .fetch_all(pool)
    .await
}

#[utoipa::path(
    get,
    path = "/api/leave/policies",
    responses((status = 200, description = "All leave policies", body = [LeavePolicy])),
    security(("bearer_auth" = [])),
    tag = "Policies"
)]
pub async fn list_policies(_auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    let policies = sqlx::query_as::<_, LeavePolicy>(&format!("{POLICY_SELECT} ORDER BY name ASC"))
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch leave policies"))?;

    Ok(HttpResponse::Ok().json(policies))
}

#[utoipa::path(
    get,
    path = "/api/leave/policies/{id}",
    params(("id" = u64, Path, description = "Policy id")),
    responses(
        (status = 200, description = "Leave policy", body = LeavePolicy),
        (status = 400, description = "Invalid policy ID"),
        (status = 404, description = "Leave policy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Policies"
)]
pub async fn get_policy(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ApiResult<impl Responder> {
    let id = parse_id(&path, "Invalid policy ID")?;
    let policy = fetch_policy(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(policy))
}

#[utoipa::path(
    post,
    path = "/api/leave/policies",
    request_body = CreatePolicy,
    responses(
        (status = 201, description = "Policy created", body = LeavePolicy),
        (status = 400, description = "Invalid policy"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Policies"
)]
pub async fn create_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePolicy>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    validate_create(&payload)?;
    ensure_leave_type(pool.get_ref(), payload.leave_type_id).await?;

    let id = sqlx::query(
        r#"
        INSERT INTO leave_policies
            (name, description, leave_type_id, min_notice_days, max_consecutive_days,
             max_requests_per_year, requires_approval, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.description.as_deref())
    .bind(payload.leave_type_id)
    .bind(payload.min_notice_days)
    .bind(payload.max_consecutive_days)
    .bind(payload.max_requests_per_year)
    .bind(payload.requires_approval)
    .bind(payload.is_active)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to create leave policy"))?
    .last_insert_id();

    info!(policy_id = id, created_by = auth.user_id, "Leave policy created");

    let policy = fetch_policy(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(policy))
}

#[utoipa::path(
    put,
    path = "/api/leave/policies/{id}",
    params(("id" = u64, Path, description = "Policy id")),
    request_body(content = Object, description = "Any subset of the CreatePolicy fields"),
    responses(
        (status = 200, description = "Updated policy", body = LeavePolicy),
        (status = 400, description = "Invalid id or field value"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Leave policy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Policies"
)]
pub async fn update_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let id = parse_id(&path, "Invalid policy ID")?;
    validate_update(&payload)?;
    let update = build_update_sql("leave_policies", &POLICY_COLUMNS, &payload, "id", id)?;

    fetch_policy(pool.get_ref(), id).await?;
    ensure_leave_type(
        pool.get_ref(),
        payload.get("leaveTypeId").and_then(Value::as_u64),
    )
    .await?;

    execute_update(pool.get_ref(), update)
        .await
        .map_err(ApiError::db("Failed to update leave policy"))?;

    info!(policy_id = id, updated_by = auth.user_id, "Leave policy updated");

    let policy = fetch_policy(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(policy))
}

#[utoipa::path(
    delete,
    path = "/api/leave/policies/{id}",
    params(("id" = u64, Path, description = "Policy id")),
    responses(
        (status = 204, description = "Policy deleted"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Leave policy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Policies"
)]
pub async fn delete_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let id = parse_id(&path, "Invalid policy ID")?;

    let result = sqlx::query("DELETE FROM leave_policies WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to delete leave policy"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Leave policy not found"));
    }

    info!(policy_id = id, deleted_by = auth.user_id, "Leave policy deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{app_data, bearer, peer};
    use crate::model::role::Role;
    use actix_web::{App, http::StatusCode, test::{self}};
    use serde_json::json;

    fn create(body: Value) -> CreatePolicy {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn create_defaults_to_an_active_policy() {
        let policy = create(json!({ "name": "Notice" }));
        assert!(policy.is_active);
        assert!(policy.requires_approval);
        assert_eq!(policy.min_notice_days, 0);
        assert!(validate_create(&policy).is_ok());
    }

    #[test]
    fn create_rejects_invalid_limits() {
        for body in [
            json!({ "name": " " }),
            json!({ "name": "n", "minNoticeDays": -1 }),
            json!({ "name": "n", "maxConsecutiveDays": 0 }),
            json!({ "name": "n", "maxRequestsPerYear": 0 }),
        ] {
            assert!(validate_create(&create(body.clone())).is_err(), "{body}");
        }
    }

    #[test]
    fn update_rejects_zero_limits() {
        assert!(validate_update(&json!({ "maxRequestsPerYear": 0 })).is_err());
        assert!(validate_update(&json!({ "maxRequestsPerYear": null })).is_ok());
    }

    #[actix_web::test]
    async fn malformed_policy_id_is_a_bad_request() {
        let (pool, config, _, _) = app_data();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(config)
                .route("/policies/{id}", web::get().to(get_policy))
                .route("/policies/{id}", web::delete().to(delete_policy)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/policies/latest")
            .peer_addr(peer())
            .insert_header(bearer(Role::Member))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::delete()
            .uri("/policies/4")
            .peer_addr(peer())
            .insert_header(bearer(Role::Member))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
