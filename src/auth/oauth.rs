//! Google sign-in: `/auth/google` redirects to the consent screen and
//! `/auth/google/callback` turns the returned code into a session.

use crate::{
    auth::{
        accounts::{self, AuthProvider, NewAccount},
        handlers::issue_tokens,
        jwt::TokenSubject,
        session::{removal, session_cookies},
    },
    config::Config,
    error::{ApiError, ApiResult},
    model::role::Role,
    utils::email_filter,
};
use actix_web::{
    HttpRequest, HttpResponse, Responder,
    cookie::{Cookie, SameSite, time::Duration as CookieDuration},
    http::header,
    web,
};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info, instrument, warn};
use utoipa::IntoParams;
use uuid::Uuid;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const STATE_COOKIE: &str = "oauth_state";
const REDIRECT_COOKIE: &str = "oauth_redirect";
const DEFAULT_LANDING: &str = "/dashboard";

#[derive(Deserialize, IntoParams)]
pub struct StartQuery {
    /// Relative path to land on after sign-in
    pub redirect: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct GoogleToken {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleProfile {
    email: String,
    name: Option<String>,
    #[serde(default)]
    verified_email: bool,
}

struct GoogleSettings<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    base_url: &'a str,
}

impl GoogleSettings<'_> {
    fn callback_url(&self) -> String {
        format!("{}/auth/google/callback", self.base_url)
    }
}

fn settings(config: &Config) -> ApiResult<GoogleSettings<'_>> {
    let (client_id, client_secret, base_url) = config.google_oauth().ok_or_else(|| {
        error!("Google OAuth is not configured");
        ApiError::Internal("Google OAuth is not configured".to_string())
    })?;

    Ok(GoogleSettings {
        client_id,
        client_secret,
        base_url,
    })
}

/// Only same-site relative paths are honoured.
fn safe_redirect(path: Option<&str>) -> Option<&str> {
    path.filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
}

fn short_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::minutes(10))
        .finish()
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

#[utoipa::path(
    get,
    path = "/auth/google",
    params(StartQuery),
    responses(
        (status = 302, description = "Redirect to the Google consent screen"),
        (status = 500, description = "Google OAuth is not configured")
    ),
    tag = "Auth"
)]
pub async fn google_start(
    query: web::Query<StartQuery>,
    config: web::Data<Config>,
) -> ApiResult<impl Responder> {
    let google = settings(&config)?;
    let state = Uuid::new_v4().to_simple().to_string();

    let url = reqwest::Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", google.client_id),
            ("redirect_uri", google.callback_url().as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", state.as_str()),
            ("prompt", "select_account"),
        ],
    )
    .map_err(|e| {
        error!(error = %e, "Failed to build Google authorize URL");
        ApiError::Internal("Failed to start Google sign-in".to_string())
    })?;

    let mut resp = HttpResponse::Found();
    resp.insert_header((header::LOCATION, url.to_string()))
        .cookie(short_cookie(STATE_COOKIE, state));

    if let Some(path) = safe_redirect(query.redirect.as_deref()) {
        resp.cookie(short_cookie(REDIRECT_COOKIE, path.to_string()));
    }

    Ok(resp.finish())
}

async fn fetch_profile(
    http: &reqwest::Client,
    google: &GoogleSettings<'_>,
    code: &str,
) -> Result<GoogleProfile, reqwest::Error> {
    let callback_url = google.callback_url();
    let token: GoogleToken = http
        .post(TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", google.client_id),
            ("client_secret", google.client_secret),
            ("redirect_uri", callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    http.get(USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// Existing account for the address, or a new Google account owning a new team.
async fn find_or_create_user(pool: &MySqlPool, profile: &GoogleProfile) -> ApiResult<TokenSubject> {
    let email = email_filter::normalize(&profile.email);

    if let Some(user) = accounts::find_by_email(pool, &email)
        .await
        .map_err(ApiError::db("Failed to look up user"))?
    {
        let user_id = user.id;
        return TokenSubject::try_from(user).map_err(|_| {
            error!(user_id, "Stored role is invalid");
            ApiError::Internal("Failed to sign in".to_string())
        });
    }

    let user_id = accounts::create_account(
        pool,
        NewAccount {
            email: &email,
            name: profile.name.as_deref(),
            password_hash: None,
            provider: AuthProvider::Google,
        },
    )
    .await
    .map_err(ApiError::db("Failed to create user"))?;

    Ok(TokenSubject {
        user_id,
        email,
        role: Role::Owner,
    })
}

#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Session cookie set, redirect to the dashboard"),
        (status = 400, description = "State mismatch or missing code"),
        (status = 500, description = "Google OAuth is not configured or the exchange failed")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_google_callback", skip_all)]
pub async fn google_callback(
    req: HttpRequest,
    query: web::Query<CallbackQuery>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    http: web::Data<reqwest::Client>,
) -> ApiResult<impl Responder> {
    let google = settings(&config)?;

    if let Some(reason) = query.error.as_deref() {
        warn!(reason, "Google sign-in was cancelled or refused");
        return Ok(redirect_to(&format!("{}/login?error=oauth", google.base_url)));
    }

    let expected = req.cookie(STATE_COOKIE).map(|c| c.value().to_string());
    match (query.state.as_deref(), expected.as_deref()) {
        (Some(got), Some(want)) if got == want => {}
        _ => return Err(ApiError::bad_request("Invalid OAuth state")),
    }

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let profile = fetch_profile(&http, &google, code).await.map_err(|e| {
        error!(error = %e, "Google token exchange failed");
        ApiError::Internal("Google sign-in failed".to_string())
    })?;

    if !profile.verified_email {
        return Err(ApiError::bad_request("Google account e-mail is not verified"));
    }

    let subject = find_or_create_user(pool.get_ref(), &profile).await?;
    let tokens = issue_tokens(pool.get_ref(), &config, &subject).await?;

    let landing = req
        .cookie(REDIRECT_COOKIE)
        .and_then(|c| safe_redirect(Some(c.value())).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LANDING.to_string());

    info!(user_id = subject.user_id, "Google sign-in successful");

    let mut resp = HttpResponse::Found();
    resp.insert_header((header::LOCATION, format!("{}{}", google.base_url, landing)));
    for cookie in session_cookies(tokens, &config) {
        resp.cookie(cookie);
    }
    Ok(resp
        .cookie(removal(STATE_COOKIE, "/"))
        .cookie(removal(REDIRECT_COOKIE, "/"))
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("/leave/requests"), Some("/leave/requests"))]
    #[case(Some("//evil.example.com"), None)]
    #[case(Some("https://evil.example.com"), None)]
    #[case(Some("/\\evil"), None)]
    #[case(None, None)]
    fn only_relative_redirects_are_kept(#[case] input: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(safe_redirect(input), expected);
    }

    #[test]
    fn callback_url_is_derived_from_base_url() {
        let google = GoogleSettings {
            client_id: "id",
            client_secret: "secret",
            base_url: "https://leave.example.com",
        };
        assert_eq!(google.callback_url(), "https://leave.example.com/auth/google/callback");
    }
}
