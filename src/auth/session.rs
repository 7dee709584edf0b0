//! Cookie-backed sessions for browser sign-ins.

use crate::auth::auth::{REFRESH_COOKIE, SESSION_COOKIE};
use crate::auth::handlers::TokenPair;
use crate::config::Config;
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};

/// The refresh cookie is only sent to `/auth/refresh` and `/auth/logout`.
pub const REFRESH_COOKIE_PATH: &str = "/auth";

fn http_only(name: &'static str, value: String, path: &'static str, ttl: usize) -> Cookie<'static> {
    Cookie::build(name, value)
        .path(path)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(ttl as i64))
        .finish()
}

/// `session` carries the access token, `refresh_token` the rotating refresh token.
pub fn session_cookies(tokens: TokenPair, config: &Config) -> [Cookie<'static>; 2] {
    [
        http_only(SESSION_COOKIE, tokens.access_token, "/", config.access_token_ttl),
        http_only(
            REFRESH_COOKIE,
            tokens.refresh_token,
            REFRESH_COOKIE_PATH,
            config.refresh_token_ttl,
        ),
    ]
}

pub fn removal(name: &'static str, path: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path(path).finish();
    cookie.make_removal();
    cookie
}

pub fn cleared_session_cookies() -> [Cookie<'static>; 2] {
    [
        removal(SESSION_COOKIE, "/"),
        removal(REFRESH_COOKIE, REFRESH_COOKIE_PATH),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TokenPair {
        TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn session_cookies_follow_token_lifetimes() {
        let config = Config::for_tests();
        let [session, refresh] = session_cookies(tokens(), &config);

        assert_eq!(session.name(), SESSION_COOKIE);
        assert_eq!(session.value(), "access");
        assert_eq!(session.path(), Some("/"));
        assert_eq!(session.http_only(), Some(true));
        assert_eq!(session.max_age(), Some(CookieDuration::seconds(900)));

        assert_eq!(refresh.name(), REFRESH_COOKIE);
        assert_eq!(refresh.value(), "refresh");
        assert_eq!(refresh.path(), Some(REFRESH_COOKIE_PATH));
        assert_eq!(refresh.max_age(), Some(CookieDuration::seconds(604_800)));
    }

    #[test]
    fn cleared_cookies_match_the_issued_paths() {
        let [session, refresh] = cleared_session_cookies();
        assert_eq!((session.name(), session.path()), (SESSION_COOKIE, Some("/")));
        assert_eq!((refresh.name(), refresh.path()), (REFRESH_COOKIE, Some(REFRESH_COOKIE_PATH)));
        assert_eq!(refresh.value(), "");
        assert_eq!(refresh.max_age(), Some(CookieDuration::ZERO));
    }
}
