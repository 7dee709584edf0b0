use crate::api::allowance::ensure_allowance;
use crate::api::parse_id;
use crate::api::policy::applicable_policies;
use crate::api::team::{team_of, team_owner};
use crate::auth::{accounts, auth::AuthUser};
use crate::email::{Mailer, templates::LeaveEmailData};
use crate::error::{ApiError, ApiResult};
use crate::leave::days::{allowance_year, resolve_total_days, validate_range};
use crate::leave::rules::{self, Candidate, YearUsage};
use crate::model::leave_request::{
    DETAIL_SELECT, LeaveRequest, LeaveRequestDetail, LeaveRequestDetailRow, LeaveStatus,
    REQUEST_COLUMNS,
};
use crate::utils::leave_type_cache;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveRequest {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-11-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-11-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Defaults to the calendar days in the range; half days allowed
    #[schema(example = 4.5, nullable = true)]
    pub total_days: Option<f64>,
    #[schema(example = "Family trip", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectLeaveRequest {
    #[schema(example = "Team is short-staffed that week")]
    pub reason: String,
}

async fn fetch_request(pool: &MySqlPool, id: u64) -> ApiResult<LeaveRequest> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests lr WHERE lr.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(ApiError::db("Failed to fetch leave request"))?
    .ok_or_else(|| ApiError::not_found("Leave request not found"))
}

async fn fetch_detail(pool: &MySqlPool, id: u64) -> Result<Option<LeaveRequestDetail>, sqlx::Error> {
    let row = sqlx::query_as::<_, LeaveRequestDetailRow>(&format!("{DETAIL_SELECT} WHERE lr.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Into::into))
}

async fn list_details(pool: &MySqlPool, filter: &str) -> Result<Vec<LeaveRequestDetail>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LeaveRequestDetailRow>(&format!(
        "{DETAIL_SELECT} {filter} ORDER BY lr.created_at DESC, lr.id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Pending and approved requests the user already filed in `year`.
async fn year_usage(
    pool: &MySqlPool,
    user_id: u64,
    leave_type_id: u64,
    year: i32,
) -> Result<YearUsage, sqlx::Error> {
    let (all_types, same_type) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*),
               CAST(COALESCE(SUM(CASE WHEN leave_type_id = ? THEN 1 ELSE 0 END), 0) AS SIGNED)
        FROM leave_requests
        WHERE user_id = ? AND YEAR(start_date) = ? AND status IN ('pending', 'approved')
        "#,
    )
    .bind(leave_type_id)
    .bind(user_id)
    .bind(year)
    .fetch_one(pool)
    .await?;

    Ok(YearUsage {
        same_type,
        all_types,
    })
}

fn email_data(detail: &LeaveRequestDetail) -> LeaveEmailData {
    LeaveEmailData {
        to: detail.user.email.clone(),
        user_name: detail.user.name.clone().unwrap_or_else(|| "User".to_string()),
        leave_type: detail.leave_type.name.clone(),
        start_date: detail.request.start_date,
        end_date: detail.request.end_date,
        total_days: detail.request.total_days,
        reason: detail.request.reason.clone(),
    }
}

/// Display name of the acting manager for notification copy.
async fn actor_name(pool: &MySqlPool, auth: &AuthUser) -> String {
    match accounts::find_by_id(pool, auth.user_id).await {
        Ok(Some(user)) => user.display_name().to_string(),
        Ok(None) => "Manager".to_string(),
        Err(e) => {
            warn!(error = %e, user_id = auth.user_id, "Failed to load manager name");
            "Manager".to_string()
        }
    }
}

async fn notify_submitted(pool: &MySqlPool, mailer: &Mailer, detail: &LeaveRequestDetail) {
    let owner = match team_of(pool, detail.user.id).await {
        Ok(Some(team_id)) => team_owner(pool, team_id).await,
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    let owner = owner.unwrap_or_else(|e| {
        warn!(error = %e, request_id = detail.request.id, "Failed to load team owner");
        None
    });

    let data = email_data(detail);
    let manager_name = owner
        .as_ref()
        .and_then(|o| o.name.clone())
        .unwrap_or_else(|| "Your Manager".to_string());

    mailer.leave_submitted(&data, &manager_name);

    if let Some(owner) = owner.filter(|o| o.id != detail.user.id) {
        mailer.manager_notification(&owner.email, &data, detail.request.id);
    }
}

#[utoipa::path(
    get,
    path = "/api/leave/requests",
    responses(
        (status = 200, description = "Caller's leave requests, newest first", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_requests(auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    let requests = sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests lr WHERE lr.user_id = ? ORDER BY lr.created_at DESC, lr.id DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch leave requests"))?;

    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    post,
    path = "/api/leave/requests",
    request_body(
        content = CreateLeaveRequest,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted as pending", body = LeaveRequest),
        (status = 400, description = "Invalid dates, unknown leave type or policy violation",
         example = json!({
            "error": "Leave request violates policy",
            "details": [{
                "policyId": 1,
                "policy": "Annual leave notice",
                "rule": "minNoticeDays",
                "message": "Requires at least 14 days notice, got 3"
            }]
         })
        ),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Mailer>,
    payload: web::Json<CreateLeaveRequest>,
) -> ApiResult<impl Responder> {
    let today = Utc::now().date_naive();

    validate_range(payload.start_date, payload.end_date, today)?;
    let total_days = resolve_total_days(payload.start_date, payload.end_date, payload.total_days)?;

    let leave_type = leave_type_cache::find(pool.get_ref(), payload.leave_type_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid leave type"))?;

    let policies = applicable_policies(pool.get_ref(), leave_type.id)
        .await
        .map_err(ApiError::db("Failed to fetch leave policies"))?;

    if !policies.is_empty() {
        let usage = year_usage(
            pool.get_ref(),
            auth.user_id,
            leave_type.id,
            payload.start_date.year(),
        )
        .await
        .map_err(ApiError::db("Failed to check leave policies"))?;

        let candidate = Candidate {
            leave_type_id: leave_type.id,
            start_date: payload.start_date,
            total_days,
        };
        let violations = rules::check(&policies, &candidate, today, usage);
        if !violations.is_empty() {
            info!(user_id = auth.user_id, count = violations.len(), "Leave request violates policy");
            return Err(ApiError::invalid("Leave request violates policy", json!(violations)));
        }
    }

    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let id = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_id, leave_type_id, start_date, end_date, total_days, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(leave_type.id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(total_days)
    .bind(reason)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        ApiError::Internal("Failed to create leave request".to_string())
    })?
    .last_insert_id();

    info!(request_id = id, user_id = auth.user_id, total_days, "Leave request submitted");

    match fetch_detail(pool.get_ref(), id).await {
        Ok(Some(detail)) => notify_submitted(pool.get_ref(), &mailer, &detail).await,
        Ok(None) => warn!(request_id = id, "Submitted request disappeared before notification"),
        Err(e) => warn!(error = %e, request_id = id, "Failed to load request for notification"),
    }

    let created = fetch_request(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/leave/requests/pending",
    responses(
        (status = 200, description = "Pending requests with user and leave type details"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn pending_requests(auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    auth.require_manager()?;

    let requests = list_details(pool.get_ref(), "WHERE lr.status = 'pending'")
        .await
        .map_err(ApiError::db("Failed to fetch pending requests"))?;

    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    get,
    path = "/api/leave/requests/all",
    responses(
        (status = 200, description = "Every request with user and leave type details"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn all_requests(auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    auth.require_manager()?;

    let requests = list_details(pool.get_ref(), "")
        .await
        .map_err(ApiError::db("Failed to fetch leave requests"))?;

    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    get,
    path = "/api/leave/requests/{id}",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Request with user and leave type details"),
        (status = 400, description = "Invalid request ID"),
        (status = 403, description = "Not the requester or a manager"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ApiResult<impl Responder> {
    let id = parse_id(&path, "Invalid request ID")?;

    let detail = fetch_detail(pool.get_ref(), id)
        .await
        .map_err(ApiError::db("Failed to fetch leave request"))?
        .ok_or_else(|| ApiError::not_found("Leave request not found"))?;

    if detail.request.user_id != auth.user_id && !auth.is_manager() {
        return Err(ApiError::forbidden());
    }

    Ok(HttpResponse::Ok().json(detail))
}

fn ensure_pending(request: &LeaveRequest, next: LeaveStatus) -> ApiResult<()> {
    match request.status() {
        Some(status) if status.can_transition_to(next) => Ok(()),
        _ => Err(ApiError::bad_request("Leave request is not pending")),
    }
}

/// Marks a pending request approved and books its days against the
/// allowance of the start-date year, all in one transaction.
pub(crate) async fn approve_pending(pool: &MySqlPool, id: u64, approver_id: u64) -> ApiResult<()> {
    let request = fetch_request(pool, id).await?;
    ensure_pending(&request, LeaveStatus::Approved)?;

    let failed = "Failed to approve leave request";
    let mut tx = pool.begin().await.map_err(ApiError::db(failed))?;

    let updated = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, approved_by = ?, approved_at = NOW()
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(LeaveStatus::Approved.as_ref())
    .bind(approver_id)
    .bind(id)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db(failed))?;

    // lost the race to another reviewer; dropping tx rolls back
    if updated.rows_affected() == 0 {
        return Err(ApiError::bad_request("Leave request is not pending"));
    }

    let year = allowance_year(request.start_date);
    let allowance = ensure_allowance(&mut tx, request.user_id, year)
        .await
        .map_err(ApiError::db(failed))?;

    sqlx::query("UPDATE leave_allowances SET used_days = used_days + ? WHERE id = ?")
        .bind(request.total_days)
        .bind(allowance.id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db(failed))?;

    tx.commit().await.map_err(ApiError::db(failed))?;

    info!(
        request_id = id,
        approved_by = approver_id,
        allowance_year = year,
        days = request.total_days,
        "Leave request approved"
    );
    Ok(())
}

pub(crate) async fn reject_pending(
    pool: &MySqlPool,
    id: u64,
    reviewer_id: u64,
    reason: &str,
) -> ApiResult<()> {
    let request = fetch_request(pool, id).await?;
    ensure_pending(&request, LeaveStatus::Rejected)?;

    let updated = sqlx::query(
        "UPDATE leave_requests SET status = ?, rejection_reason = ? WHERE id = ? AND status = ?",
    )
    .bind(LeaveStatus::Rejected.as_ref())
    .bind(reason)
    .bind(id)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool)
    .await
    .map_err(ApiError::db("Failed to reject leave request"))?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::bad_request("Leave request is not pending"));
    }

    info!(request_id = id, rejected_by = reviewer_id, "Leave request rejected");
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/leave/requests/{id}/approve",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Approved; days deducted from the allowance", body = Object,
         example = json!({ "success": true })),
        (status = 400, description = "Invalid request ID or request is not pending"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Mailer>,
    path: web::Path<String>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let id = parse_id(&path, "Invalid request ID")?;

    approve_pending(pool.get_ref(), id, auth.user_id).await?;

    match fetch_detail(pool.get_ref(), id).await {
        Ok(Some(detail)) => {
            let approver = actor_name(pool.get_ref(), &auth).await;
            mailer.leave_approved(&email_data(&detail), &approver);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, request_id = id, "Failed to load request for notification"),
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[utoipa::path(
    post,
    path = "/api/leave/requests/{id}/reject",
    params(("id" = u64, Path, description = "Leave request id")),
    request_body = RejectLeaveRequest,
    responses(
        (status = 200, description = "Rejected", body = Object, example = json!({ "success": true })),
        (status = 400, description = "Invalid request ID, missing reason or request is not pending"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Mailer>,
    path: web::Path<String>,
    payload: web::Json<RejectLeaveRequest>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let id = parse_id(&path, "Invalid request ID")?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::invalid(
            "Invalid request data",
            json!([{ "field": "reason", "message": "Rejection reason is required" }]),
        ));
    }

    reject_pending(pool.get_ref(), id, auth.user_id, reason).await?;

    match fetch_detail(pool.get_ref(), id).await {
        Ok(Some(detail)) => {
            let reviewer = actor_name(pool.get_ref(), &auth).await;
            mailer.leave_rejected(&email_data(&detail), &reviewer, reason);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, request_id = id, "Failed to load request for notification"),
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}


#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::model::role::Role;

    async fn seeded(pool: &MySqlPool) -> u64 {
        crate::db::seed_defaults(pool).await.unwrap();
        sqlx::query_scalar::<_, u64>("SELECT id FROM leave_types ORDER BY id LIMIT 1")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn user(pool: &MySqlPool, email: &str, role: Role) -> u64 {
        sqlx::query("INSERT INTO users (email, role) VALUES (?, ?)")
            .bind(email)
            .bind(role.as_ref())
            .execute(pool)
            .await
            .unwrap()
            .last_insert_id()
    }

    async fn allowance(pool: &MySqlPool, user_id: u64, year: i32, total: f64, used: f64) {
        sqlx::query(
            "INSERT INTO leave_allowances (user_id, year, total_days, used_days, carried_over) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(user_id)
        .bind(year)
        .bind(total)
        .bind(used)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn pending(pool: &MySqlPool, user_id: u64, type_id: u64, start: NaiveDate, days: f64) -> u64 {
        sqlx::query(
            r#"
            INSERT INTO leave_requests (user_id, leave_type_id, start_date, end_date, total_days)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(type_id)
        .bind(start)
        .bind(start + chrono::Duration::days(days.ceil() as i64 - 1))
        .bind(days)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_id()
    }

    /// (total_days, used_days, carried_over)
    async fn balance(pool: &MySqlPool, user_id: u64, year: i32) -> Option<(f64, f64, f64)> {
        sqlx::query_as(
            "SELECT total_days, used_days, carried_over FROM leave_allowances WHERE user_id = ? AND year = ?",
        )
        .bind(user_id)
        .bind(year)
        .fetch_optional(pool)
        .await
        .unwrap()
    }

    async fn stored(pool: &MySqlPool, id: u64) -> LeaveRequest {
        fetch_request(pool, id).await.unwrap()
    }

    fn march_2030() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 4).unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn approval_books_days_exactly_once(pool: MySqlPool) {
        let type_id = seeded(&pool).await;
        let manager = user(&pool, "boss@company.com", Role::Owner).await;
        let member = user(&pool, "jane@company.com", Role::Member).await;
        allowance(&pool, member, 2030, 25.0, 2.0).await;
        let id = pending(&pool, member, type_id, march_2030(), 3.0).await;

        approve_pending(&pool, id, manager).await.unwrap();

        let request = stored(&pool, id).await;
        assert_eq!(request.status, "approved");
        assert_eq!(request.approved_by, Some(manager));
        assert!(request.approved_at.is_some());
        assert_eq!(balance(&pool, member, 2030).await, Some((25.0, 5.0, 0.0)));

        let err = approve_pending(&pool, id, manager).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
        assert_eq!(err.to_string(), "Leave request is not pending");
        assert_eq!(balance(&pool, member, 2030).await, Some((25.0, 5.0, 0.0)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_approvals_book_days_once(pool: MySqlPool) {
        let type_id = seeded(&pool).await;
        let manager = user(&pool, "boss@company.com", Role::Owner).await;
        let member = user(&pool, "jane@company.com", Role::Member).await;
        allowance(&pool, member, 2030, 25.0, 0.0).await;
        let id = pending(&pool, member, type_id, march_2030(), 3.0).await;

        let (first, second) = futures::join!(
            approve_pending(&pool, id, manager),
            approve_pending(&pool, id, manager)
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(balance(&pool, member, 2030).await, Some((25.0, 3.0, 0.0)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn approval_opens_the_allowance_with_carry_over(pool: MySqlPool) {
        let type_id = seeded(&pool).await;
        let manager = user(&pool, "boss@company.com", Role::Owner).await;

        // 3 days left last year, under the 5 day cap
        let small = user(&pool, "small@company.com", Role::Member).await;
        allowance(&pool, small, 2029, 25.0, 22.0).await;
        let id = pending(&pool, small, type_id, march_2030(), 2.0).await;
        approve_pending(&pool, id, manager).await.unwrap();
        assert_eq!(balance(&pool, small, 2030).await, Some((25.0, 2.0, 3.0)));

        // 15 days left last year, capped at 5
        let large = user(&pool, "large@company.com", Role::Member).await;
        allowance(&pool, large, 2029, 25.0, 10.0).await;
        let id = pending(&pool, large, type_id, march_2030(), 1.0).await;
        approve_pending(&pool, id, manager).await.unwrap();
        assert_eq!(balance(&pool, large, 2030).await, Some((25.0, 1.0, 5.0)));

        // no history at all
        let fresh = user(&pool, "fresh@company.com", Role::Member).await;
        let id = pending(&pool, fresh, type_id, march_2030(), 0.5).await;
        approve_pending(&pool, id, manager).await.unwrap();
        assert_eq!(balance(&pool, fresh, 2030).await, Some((25.0, 0.5, 0.0)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rejection_stores_the_reason_and_books_nothing(pool: MySqlPool) {
        let type_id = seeded(&pool).await;
        let manager = user(&pool, "boss@company.com", Role::Admin).await;
        let member = user(&pool, "jane@company.com", Role::Member).await;
        let id = pending(&pool, member, type_id, march_2030(), 2.0).await;

        reject_pending(&pool, id, manager, "Team is short-staffed").await.unwrap();

        let request = stored(&pool, id).await;
        assert_eq!(request.status, "rejected");
        assert_eq!(request.rejection_reason.as_deref(), Some("Team is short-staffed"));
        assert_eq!(request.approved_by, None);
        assert_eq!(balance(&pool, member, 2030).await, None);

        let err = approve_pending(&pool, id, manager).await.unwrap_err();
        assert_eq!(err.to_string(), "Leave request is not pending");
        assert_eq!(balance(&pool, member, 2030).await, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reviewing_a_missing_request_is_not_found(pool: MySqlPool) {
        seeded(&pool).await;
        let manager = user(&pool, "boss@company.com", Role::Owner).await;

        let err = approve_pending(&pool, 999, manager).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        let err = reject_pending(&pool, 999, manager, "No").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
