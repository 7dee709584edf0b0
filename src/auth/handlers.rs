use crate::{
    auth::{
        accounts::{self, AuthProvider, NewAccount},
        auth::{AuthUser, refresh_request_token},
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{MIN_PASSWORD_LEN, hash_password, verify_password},
        session::{cleared_session_cookies, session_cookies},
    },
    config::Config,
    error::{ApiError, ApiResult},
    model::{role::Role, user::UserProfile},
    models::{LoginReqDto, RegisterReq, SetPasswordReq, TokenType, UserSql},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    error!(error = %e, "Failed to sign token");
    ApiError::Internal("Failed to issue token".to_string())
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Signs an access token and a stored refresh token for `subject`.
pub(crate) async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    subject: &TokenSubject,
) -> ApiResult<TokenPair> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
            .map_err(token_error)?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    // expired or rotated rows of this user are dead weight
    match sqlx::query(
        "DELETE FROM refresh_tokens WHERE user_id = ? AND (revoked = TRUE OR expires_at < NOW())",
    )
    .bind(subject.user_id)
    .execute(pool)
    .await
    {
        Ok(done) if done.rows_affected() > 0 => {
            debug!(user_id = subject.user_id, removed = done.rows_affected(), "Stale refresh tokens removed")
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to remove stale refresh tokens"),
    }

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(ApiError::db("Failed to store refresh token"))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// true  => e-mail AVAILABLE
/// false => e-mail TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email_filter::normalize(email);

    // fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    if exists {
        email_cache::mark_taken(&email).await;
        return false;
    }

    true
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account and team created", body = Object,
         example = json!({ "message": "User registered successfully", "userId": 1 })),
        (status = 400, description = "Invalid e-mail or password"),
        (status = 409, description = "E-mail already registered")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(pool, user), fields(email = %user.email))]
pub async fn register(
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> ApiResult<impl Responder> {
    let email = email_filter::normalize(&user.email);

    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    if user.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let hashed = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal("Failed to register user".to_string())
    })?;

    let name = user.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let user_id = accounts::create_account(
        pool.get_ref(),
        NewAccount {
            email: &email,
            name,
            password_hash: Some(&hashed),
            provider: AuthProvider::Password,
        },
    )
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return ApiError::Conflict("Email already registered".to_string());
            }
        }
        error!(error = %e, "Failed to register user");
        ApiError::Internal("Failed to register user".to_string())
    })?;

    info!(user_id, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "userId": user_id
    })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<impl Responder> {
    info!("Login request received");

    let email = email_filter::normalize(&user.email);
    if email.is_empty() || user.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, email, password_hash, role
        FROM users
        WHERE email = ? AND deleted_at IS NULL
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to sign in"))?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        invalid()
    })?;

    let Some(hashed) = db_user.password_hash.as_deref() else {
        info!(user_id = db_user.id, "Password login attempted on an OAuth-only account");
        return Err(invalid());
    };

    if let Err(e) = verify_password(&user.password, hashed) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    let role = Role::from_str(&db_user.role).map_err(|_| {
        error!(user_id = db_user.id, role = %db_user.role, "Stored role is invalid");
        ApiError::Internal("Failed to sign in".to_string())
    })?;

    let subject = TokenSubject {
        user_id: db_user.id,
        email: db_user.email,
        role,
    };
    let tokens = issue_tokens(pool.get_ref(), &config, &subject).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(subject.user_id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = subject.user_id, "Login successful");

    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes `token` and issues a new pair for the account as it is stored now.
pub(crate) async fn rotate_refresh_token(
    pool: &MySqlPool,
    config: &Config,
    token: &str,
) -> ApiResult<TokenPair> {
    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| ApiError::unauthorized())?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::unauthorized());
    }

    let record = sqlx::query_as::<_, (u64, bool)>(
        "SELECT id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool)
    .await
    .map_err(ApiError::db("Failed to refresh token"))?;

    let record_id = match record {
        Some((id, false)) => id,
        _ => return Err(ApiError::unauthorized()),
    };

    let revoked = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ? AND revoked = FALSE")
        .bind(record_id)
        .execute(pool)
        .await
        .map_err(ApiError::db("Failed to refresh token"))?;

    // a concurrent refresh already rotated this token
    if revoked.rows_affected() == 0 {
        return Err(ApiError::unauthorized());
    }

    let user = accounts::find_by_id(pool, claims.user_id)
        .await
        .map_err(ApiError::db("Failed to refresh token"))?
        .ok_or_else(|| {
            info!(user_id = claims.user_id, "Refresh refused: account missing or deleted");
            ApiError::unauthorized()
        })?;

    let subject = TokenSubject::try_from(user).map_err(|_| {
        error!(user_id = claims.user_id, "Stored role is invalid");
        ApiError::unauthorized()
    })?;

    issue_tokens(pool, config, &subject).await
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair; cookie sessions also get fresh cookies", body = TokenPair),
        (status = 401, description = "Missing, revoked or invalid refresh token, or the account is gone")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<impl Responder> {
    let token =
        refresh_request_token(&req).ok_or_else(|| ApiError::Unauthorized("No token".to_string()))?;
    let cookie_session = bearer(&req).is_none();

    let tokens = rotate_refresh_token(pool.get_ref(), &config, &token).await?;

    let mut resp = HttpResponse::Ok();
    if cookie_session {
        for cookie in session_cookies(tokens.clone(), &config) {
            resp.cookie(cookie);
        }
    }
    Ok(resp.json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked and session cookies cleared (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let mut resp = HttpResponse::NoContent();
    for cookie in cleared_session_cookies() {
        resp.cookie(cookie);
    }

    let claims = refresh_request_token(&req)
        .and_then(|token| verify_token(&token, &config.jwt_secret).ok())
        .filter(|c| c.token_type == TokenType::Refresh);

    if let Some(claims) = claims {
        if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
            .bind(&claims.jti)
            .execute(pool.get_ref())
            .await
        {
            error!(error = %e, "Failed to revoke refresh token");
        }
    }

    resp.finish()
}

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Caller profile", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<impl Responder> {
    let user = accounts::find_by_id(pool.get_ref(), auth.user_id)
        .await
        .map_err(ApiError::db("Failed to fetch user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/user/password",
    request_body = SetPasswordReq,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Password too short or current password missing"),
        (status = 401, description = "Current password is incorrect")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn set_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SetPasswordReq>,
) -> ApiResult<impl Responder> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = accounts::find_by_id(pool.get_ref(), auth.user_id)
        .await
        .map_err(ApiError::db("Failed to fetch user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(existing) = user.password_hash.as_deref() {
        let current = payload
            .current_password
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("Current password is required"))?;

        if verify_password(current, existing).is_err() {
            return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
        }
    }

    let hashed = hash_password(&payload.new_password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal("Failed to update password".to_string())
    })?;

    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&hashed)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to update password"))?;

    info!(user_id = auth.user_id, "Password updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated" })))
}


#[cfg(test)]
mod db_tests {
    use super::*;

    async fn member(pool: &MySqlPool, email: &str) -> TokenSubject {
        let user_id = sqlx::query("INSERT INTO users (email, role) VALUES (?, 'member')")
            .bind(email)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_id();
        TokenSubject {
            user_id,
            email: email.to_string(),
            role: Role::Member,
        }
    }

    async fn stored_tokens(pool: &MySqlPool, user_id: u64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn refreshed_tokens_carry_the_current_role(pool: MySqlPool) {
        let config = Config::for_tests();
        let subject = member(&pool, "jane@company.com").await;
        let first = issue_tokens(&pool, &config, &subject).await.unwrap();

        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(subject.user_id)
            .execute(&pool)
            .await
            .unwrap();

        let rotated = rotate_refresh_token(&pool, &config, &first.refresh_token).await.unwrap();
        let claims = verify_token(&rotated.access_token, &config.jwt_secret).unwrap();
        assert_eq!(claims.role, Role::Admin.id());
        assert_eq!(claims.user_id, subject.user_id);

        // the old refresh token was rotated away
        let err = rotate_refresh_token(&pool, &config, &first.refresh_token).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleted_accounts_cannot_refresh(pool: MySqlPool) {
        let config = Config::for_tests();
        let subject = member(&pool, "gone@company.com").await;
        let tokens = issue_tokens(&pool, &config, &subject).await.unwrap();

        sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = ?")
            .bind(subject.user_id)
            .execute(&pool)
            .await
            .unwrap();

        let err = rotate_refresh_token(&pool, &config, &tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn issuing_tokens_drops_expired_and_revoked_rows(pool: MySqlPool) {
        let config = Config::for_tests();
        let subject = member(&pool, "jane@company.com").await;
        let other = member(&pool, "other@company.com").await;

        for (user_id, jti, revoked, expires) in [
            (subject.user_id, "expired", false, "2000-01-01 00:00:00"),
            (subject.user_id, "revoked", true, "2099-01-01 00:00:00"),
            (other.user_id, "other-expired", false, "2000-01-01 00:00:00"),
        ] {
            sqlx::query("INSERT INTO refresh_tokens (user_id, jti, revoked, expires_at) VALUES (?, ?, ?, ?)")
                .bind(user_id)
                .bind(jti)
                .bind(revoked)
                .bind(expires)
                .execute(&pool)
                .await
                .unwrap();
        }

        issue_tokens(&pool, &config, &subject).await.unwrap();

        assert_eq!(stored_tokens(&pool, subject.user_id).await, 1);
        // other users' rows are left for their own next sign-in
        assert_eq!(stored_tokens(&pool, other.user_id).await, 1);
    }
}
