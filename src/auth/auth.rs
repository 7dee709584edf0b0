use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

pub const SESSION_COOKIE: &str = "session";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// The authenticated caller, placed in request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

fn bearer_or_cookie(req: &HttpRequest, cookie: &str) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        return header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);
    }

    req.cookie(cookie).map(|c| c.value().to_string())
}

/// Access token from `Authorization: Bearer ...` or, failing that, the session cookie.
pub fn request_token(req: &HttpRequest) -> Option<String> {
    bearer_or_cookie(req, SESSION_COOKIE)
}

/// Refresh token from `Authorization: Bearer ...` or, failing that, the refresh cookie.
pub fn refresh_request_token(req: &HttpRequest) -> Option<String> {
    bearer_or_cookie(req, REFRESH_COOKIE)
}

impl TryFrom<Claims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> ApiResult<Self> {
        if claims.token_type != TokenType::Access {
            return Err(ApiError::Unauthorized("Invalid token type".to_string()));
        }

        let role = Role::from_id(claims.role)
            .ok_or_else(|| ApiError::Unauthorized("Invalid role".to_string()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role,
        })
    }
}

impl AuthUser {
    pub fn authenticate(req: &HttpRequest) -> ApiResult<Self> {
        let config = req
            .app_data::<Data<Config>>()
            .ok_or_else(|| ApiError::Internal("App config missing".to_string()))?;

        let token = request_token(req)
            .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?;

        let claims = verify_token(&token, &config.jwt_secret)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        AuthUser::try_from(claims)
    }

    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }

    /// Owners and admins only.
    pub fn require_manager(&self) -> ApiResult<()> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        ready(AuthUser::authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{cookie::Cookie, test::TestRequest};

    #[test]
    fn header_wins_over_cookies() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer from-header"))
            .cookie(Cookie::new(SESSION_COOKIE, "from-session"))
            .cookie(Cookie::new(REFRESH_COOKIE, "from-refresh"))
            .to_http_request();

        assert_eq!(request_token(&req).as_deref(), Some("from-header"));
        assert_eq!(refresh_request_token(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn each_token_kind_reads_its_own_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "from-session"))
            .cookie(Cookie::new(REFRESH_COOKIE, "from-refresh"))
            .to_http_request();

        assert_eq!(request_token(&req).as_deref(), Some("from-session"));
        assert_eq!(refresh_request_token(&req).as_deref(), Some("from-refresh"));

        let req = TestRequest::default().to_http_request();
        assert_eq!(refresh_request_token(&req), None);
    }
}
