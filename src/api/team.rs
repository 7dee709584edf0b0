use crate::auth::{accounts, auth::AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::model::{role::Role, team::TeamMember};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::info;
use utoipa::ToSchema;

/// Owner of a team, the recipient of approval requests.
#[derive(Debug, sqlx::FromRow)]
pub struct TeamOwner {
    pub id: u64,
    pub name: Option<String>,
    pub email: String,
}

/// The team a user joined first.
pub async fn team_of(pool: &MySqlPool, user_id: u64) -> Result<Option<u64>, sqlx::Error> {
    sqlx::query_scalar::<_, u64>(
        "SELECT team_id FROM team_members WHERE user_id = ? ORDER BY joined_at ASC, id ASC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn team_owner(pool: &MySqlPool, team_id: u64) -> Result<Option<TeamOwner>, sqlx::Error> {
    sqlx::query_as::<_, TeamOwner>(
        r#"
        SELECT u.id, u.name, u.email
        FROM team_members tm
        INNER JOIN users u ON u.id = tm.user_id
        WHERE tm.team_id = ? AND tm.role = 'owner'
        ORDER BY tm.joined_at ASC
        LIMIT 1
        "#,
    )
    .bind(team_id)
    .fetch_optional(pool)
    .await
}

async fn caller_team(pool: &MySqlPool, auth: &AuthUser) -> ApiResult<u64> {
    team_of(pool, auth.user_id)
        .await
        .map_err(ApiError::db("Failed to fetch team"))?
        .ok_or_else(|| ApiError::not_found("User not part of any team"))
}

#[utoipa::path(
    get,
    path = "/api/team/members",
    responses(
        (status = 200, description = "Members of the caller's team", body = [TeamMember]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not part of any team")
    ),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn list_members(auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    let team_id = caller_team(pool.get_ref(), &auth).await?;

    let members = sqlx::query_as::<_, TeamMember>(
        r#"
        SELECT u.id, u.name, u.email, tm.role, tm.joined_at
        FROM team_members tm
        INNER JOIN users u ON u.id = tm.user_id
        WHERE tm.team_id = ? AND u.deleted_at IS NULL
        ORDER BY tm.joined_at ASC
        "#,
    )
    .bind(team_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch team members"))?;

    Ok(HttpResponse::Ok().json(members))
}

#[derive(Deserialize, ToSchema)]
pub struct AddMemberReq {
    #[schema(example = "john@company.com")]
    pub email: String,
    /// `admin` or `member`
    #[schema(example = "member")]
    pub role: String,
}

fn member_role(raw: &str) -> ApiResult<Role> {
    match Role::from_str(raw.trim()) {
        Ok(role @ (Role::Admin | Role::Member)) => Ok(role),
        _ => Err(ApiError::bad_request("Role must be admin or member")),
    }
}

#[utoipa::path(
    post,
    path = "/api/team/members",
    request_body = AddMemberReq,
    responses(
        (status = 201, description = "User added to the caller's team"),
        (status = 400, description = "Invalid role"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "No user with that e-mail"),
        (status = 409, description = "Already a member")
    ),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn add_member(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AddMemberReq>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;
    let role = member_role(&payload.role)?;

    let team_id = caller_team(pool.get_ref(), &auth).await?;

    let email = payload.email.trim().to_lowercase();
    let user = accounts::find_by_email(pool.get_ref(), &email)
        .await
        .map_err(ApiError::db("Failed to look up user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to add team member"))?;

    let inserted = sqlx::query(
        "INSERT IGNORE INTO team_members (user_id, team_id, role) VALUES (?, ?, ?)",
    )
    .bind(user.id)
    .bind(team_id)
    .bind(role.as_ref())
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db("Failed to add team member"))?;

    if inserted.rows_affected() == 0 {
        return Err(ApiError::Conflict("User is already a team member".to_string()));
    }

    // the account role drives manager permissions
    sqlx::query("UPDATE users SET role = ? WHERE id = ? AND role <> 'owner'")
        .bind(role.as_ref())
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db("Failed to add team member"))?;

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to add team member"))?;

    info!(team_id, member_id = user.id, role = %role, "Team member added");

    Ok(HttpResponse::Created().json(serde_json::json!({
        "userId": user.id,
        "teamId": team_id,
        "role": role.as_ref()
    })))
}
