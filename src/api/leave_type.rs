use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::leave_type::LeaveType;
use crate::utils::leave_type_cache;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveType {
    #[schema(example = "Study Leave")]
    pub name: String,
    #[schema(example = "#0EA5E9")]
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub is_paid: bool,
    #[serde(default = "default_true")]
    pub requires_approval: bool,
}

fn default_true() -> bool {
    true
}

pub const DEFAULT_COLOR: &str = "#3B82F6";

/// `#RRGGBB`
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[utoipa::path(
    get,
    path = "/api/leave/types",
    responses(
        (status = 200, description = "All leave types by name", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn list_types(_auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    let types = leave_type_cache::all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(types.as_slice()))
}

#[utoipa::path(
    post,
    path = "/api/leave/types",
    request_body = CreateLeaveType,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 400, description = "Missing name or invalid colour"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn create_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeaveType>,
) -> ApiResult<impl Responder> {
    auth.require_manager()?;

    let name = payload.name.trim();
    if name.is_empty() || name.len() > 50 {
        return Err(ApiError::bad_request("Name must be between 1 and 50 characters"));
    }
    let color = payload.color.as_deref().map(str::trim).unwrap_or(DEFAULT_COLOR);
    if !is_hex_color(color) {
        return Err(ApiError::bad_request("Color must be a hex value like #3B82F6"));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO leave_types (name, color, is_paid, requires_approval)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(color)
    .bind(payload.is_paid)
    .bind(payload.requires_approval)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to create leave type"))?
    .last_insert_id();

    leave_type_cache::invalidate().await;

    let created = leave_type_cache::find(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::Internal("Failed to create leave type".to_string()))?;

    info!(leave_type_id = id, created_by = auth.user_id, "Leave type created");

    Ok(HttpResponse::Created().json(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{app_data, bearer, peer};
    use crate::model::role::Role;
    use actix_web::{App, http::StatusCode, test::{self}};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("#10B981", true)]
    #[case("#abcdef", true)]
    #[case("10B981", false)]
    #[case("#10B98", false)]
    #[case("#GGGGGG", false)]
    fn colours_are_six_digit_hex(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_hex_color(value), valid);
    }

    #[actix_web::test]
    async fn creating_a_type_is_validated() {
        let (pool, config, _, _) = app_data();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(config)
                .route("/types", web::post().to(create_type)),
        )
        .await;

        let cases = [
            (Role::Member, json!({ "name": "Study" }), StatusCode::FORBIDDEN),
            (Role::Owner, json!({ "name": "  " }), StatusCode::BAD_REQUEST),
            (Role::Owner, json!({ "name": "Study", "color": "blue" }), StatusCode::BAD_REQUEST),
        ];
        for (role, body, expected) in cases {
            let req = test::TestRequest::post()
                .uri("/types")
                .peer_addr(peer())
                .insert_header(bearer(role))
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected);
        }
    }
}
