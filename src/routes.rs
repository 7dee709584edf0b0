use crate::{
    api::{allowance, analytics, company_settings, leave_request, leave_type, policy, team},
    auth::{handlers, middleware::auth_middleware, oauth},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{error, middleware::from_fn, web};
use serde_json::json;
use std::sync::Arc;

/// Extraction failures become `{"error": "...", "details": "..."}` with status 400.
fn extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let details = err.to_string();
        error::Error::from(ApiError::invalid("Invalid request data", json!(details)))
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let details = err.to_string();
        error::Error::from(ApiError::invalid("Invalid query parameters", json!(details)))
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        let details = err.to_string();
        error::Error::from(ApiError::invalid("Invalid path parameters", json!(details)))
    }));
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("period and burst size are non-zero");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    extractors(cfg);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/google")
                    .wrap(login_limiter.clone())
                    .route(web::get().to(oauth::google_start)),
            )
            .service(
                web::resource("/google/callback")
                    .wrap(login_limiter)
                    .route(web::get().to(oauth::google_callback)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/user").route(web::get().to(handlers::me)))
            .service(web::resource("/user/password").route(web::post().to(handlers::set_password)))
            .service(
                web::scope("/leave")
                    // /leave/requests
                    .service(
                        web::resource("/requests")
                            .route(web::get().to(leave_request::my_requests))
                            .route(web::post().to(leave_request::create_request)),
                    )
                    .service(
                        web::resource("/requests/pending")
                            .route(web::get().to(leave_request::pending_requests)),
                    )
                    .service(
                        web::resource("/requests/all")
                            .route(web::get().to(leave_request::all_requests)),
                    )
                    .service(
                        web::resource("/requests/{id}")
                            .route(web::get().to(leave_request::get_request)),
                    )
                    .service(
                        web::resource("/requests/{id}/approve")
                            .route(web::post().to(leave_request::approve_request)),
                    )
                    .service(
                        web::resource("/requests/{id}/reject")
                            .route(web::post().to(leave_request::reject_request)),
                    )
                    // /leave/allowance(s)
                    .service(
                        web::resource("/allowance").route(web::get().to(allowance::my_allowance)),
                    )
                    .service(
                        web::resource("/allowances")
                            .route(web::get().to(allowance::list_allowances)),
                    )
                    .service(
                        web::resource("/allowances/all")
                            .route(web::get().to(allowance::list_allowances)),
                    )
                    .service(
                        web::resource("/allowances/{id}")
                            .route(web::put().to(allowance::update_allowance)),
                    )
                    // /leave/types
                    .service(
                        web::resource("/types")
                            .route(web::get().to(leave_type::list_types))
                            .route(web::post().to(leave_type::create_type)),
                    )
                    // /leave/policies
                    .service(
                        web::resource("/policies")
                            .route(web::get().to(policy::list_policies))
                            .route(web::post().to(policy::create_policy)),
                    )
                    .service(
                        web::resource("/policies/{id}")
                            .route(web::get().to(policy::get_policy))
                            .route(web::put().to(policy::update_policy))
                            .route(web::delete().to(policy::delete_policy)),
                    )
                    // /leave/analytics, /leave/calendar
                    .service(web::resource("/analytics").route(web::get().to(analytics::analytics)))
                    .service(
                        web::resource("/analytics/export").route(web::get().to(analytics::export)),
                    )
                    .service(web::resource("/calendar").route(web::get().to(analytics::calendar))),
            )
            .service(
                web::resource("/company/settings")
                    .route(web::get().to(company_settings::get_settings))
                    .route(web::put().to(company_settings::update_settings)),
            )
            .service(
                web::resource("/team/members")
                    .route(web::get().to(team::list_members))
                    .route(web::post().to(team::add_member)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token, or the session cookie after Google sign-in

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token (Bearer, or the refresh_token cookie)
//       └─ returns a rotated token pair

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{app_data, bearer, peer};
    use crate::auth::auth::{REFRESH_COOKIE, SESSION_COOKIE};
    use crate::model::role::Role;
    use actix_web::{App, cookie::Cookie, http::StatusCode, test::{self}};
    use serde_json::Value;

    macro_rules! app {
        ($config:expr) => {{
            let (pool, _, mailer, http) = app_data();
            let config: Config = $config;
            test::init_service(
                App::new()
                    .app_data(pool)
                    .app_data(web::Data::new(config.clone()))
                    .app_data(mailer)
                    .app_data(http)
                    .configure(|cfg| configure(cfg, config.clone())),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn protected_routes_require_a_token() {
        let app = app!(Config::for_tests());

        for uri in ["/api/leave/requests", "/api/leave/allowance", "/api/user", "/api/team/members"] {
            let req = test::TestRequest::get().uri(uri).peer_addr(peer()).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[actix_web::test]
    async fn garbage_tokens_are_rejected_with_json() {
        let app = app!(Config::for_tests());

        let req = test::TestRequest::get()
            .uri("/api/leave/types")
            .peer_addr(peer())
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[actix_web::test]
    async fn session_cookie_authenticates() {
        let app = app!(Config::for_tests());
        let (_, header) = bearer(Role::Member);
        let token = header.trim_start_matches("Bearer ").to_string();

        // member reaching a manager endpoint proves the cookie was accepted
        let req = test::TestRequest::get()
            .uri("/api/leave/requests/pending")
            .peer_addr(peer())
            .cookie(Cookie::new(SESSION_COOKIE, token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn manager_only_routes_refuse_members() {
        let app = app!(Config::for_tests());

        let cases = [
            test::TestRequest::get().uri("/api/leave/requests/all"),
            test::TestRequest::get().uri("/api/leave/allowances/all?year=2026"),
            test::TestRequest::get().uri("/api/leave/analytics/export?format=csv"),
            test::TestRequest::post().uri("/api/leave/requests/5/reject"),
            test::TestRequest::delete().uri("/api/leave/policies/5"),
            test::TestRequest::put().uri("/api/company/settings"),
        ];
        for req in cases {
            let req = req
                .peer_addr(peer())
                .insert_header(bearer(Role::Member))
                .set_json(serde_json::json!({ "reason": "x" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }
    }

    #[actix_web::test]
    async fn malformed_json_is_a_bad_request() {
        let app = app!(Config::for_tests());

        let req = test::TestRequest::post()
            .uri("/api/leave/requests")
            .peer_addr(peer())
            .insert_header(bearer(Role::Member))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"leaveTypeId\": \"one\"")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid request data");
    }

    #[actix_web::test]
    async fn register_validates_before_touching_the_database() {
        let app = app!(Config::for_tests());

        for body in [
            serde_json::json!({ "email": "not-an-email", "password": "long-enough" }),
            serde_json::json!({ "email": "jane@company.com", "password": "short" }),
        ] {
            let req = test::TestRequest::post()
                .uri("/auth/register")
                .peer_addr(peer())
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn refresh_without_token_is_unauthorized_and_logout_is_idempotent() {
        let app = app!(Config::for_tests());

        let req = test::TestRequest::post().uri("/auth/refresh").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post().uri("/auth/logout").peer_addr(peer()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn access_tokens_cannot_refresh() {
        let app = app!(Config::for_tests());

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .peer_addr(peer())
            .insert_header(bearer(Role::Owner))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn refresh_falls_back_to_the_refresh_cookie() {
        let app = app!(Config::for_tests());

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .peer_addr(peer())
            .cookie(Cookie::new(REFRESH_COOKIE, "not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        // the cookie was read and failed verification, it was not reported missing
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Unauthorized");
    }

    #[actix_web::test]
    async fn logout_clears_session_cookies() {
        let app = app!(Config::for_tests());
        let (_, header) = bearer(Role::Member);
        let token = header.trim_start_matches("Bearer ").to_string();

        let req = test::TestRequest::post()
            .uri("/auth/logout")
            .peer_addr(peer())
            .cookie(Cookie::new(SESSION_COOKIE, token))
            .cookie(Cookie::new(REFRESH_COOKIE, "not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let cleared: Vec<(String, String)> = resp
            .response()
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        assert!(cleared.contains(&(SESSION_COOKIE.to_string(), String::new())));
        assert!(cleared.contains(&(REFRESH_COOKIE.to_string(), String::new())));
    }

    #[actix_web::test]
    async fn google_sign_in_requires_configuration() {
        let app = app!(Config::for_tests());

        let req = test::TestRequest::get().uri("/auth/google").peer_addr(peer()).to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    fn google_config() -> Config {
        let mut config = Config::for_tests();
        config.google_client_id = Some("client-id".into());
        config.google_client_secret = Some("client-secret".into());
        config.base_url = Some("https://leave.example.com".into());
        config
    }

    #[actix_web::test]
    async fn google_start_sets_state_and_redirects() {
        let app = app!(google_config());

        let req = test::TestRequest::get()
            .uri("/auth/google?redirect=/leave")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);

        let location = resp.headers().get("Location").unwrap().to_str().unwrap();
        assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(location.contains("client_id=client-id"));

        let cookies: Vec<_> = resp.response().cookies().map(|c| c.name().to_string()).collect();
        assert!(cookies.contains(&"oauth_state".to_string()));
        assert!(cookies.contains(&"oauth_redirect".to_string()));
    }

    #[actix_web::test]
    async fn google_callback_checks_state() {
        let app = app!(google_config());

        let req = test::TestRequest::get()
            .uri("/auth/google/callback?code=abc&state=expected")
            .peer_addr(peer())
            .cookie(Cookie::new("oauth_state", "different"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/auth/google/callback?code=abc&state=expected")
            .peer_addr(peer())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
