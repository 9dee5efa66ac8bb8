// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! HTTP surface of the gateway.
//!
//! The request pipeline composes, outermost first: request-id stamping,
//! tracing, the process-wide rate limiter, the CORS guard and an OPTIONS
//! short-circuit. Identity-lifecycle routes are public; `/v1/users/*` sits
//! behind the token-verification middleware.

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info_span, Span};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    auth::middleware::require_auth,
    error::ApiError,
    rate_limit::rate_limit_middleware,
    state::AppState,
};

pub mod health;
pub mod identity;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router with the full request pipeline applied.
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_credentials(true);

    let identity_routes = Router::new()
        .route("/identity/signup", post(identity::sign_up))
        .route("/identity/confirm-signup", post(identity::confirm_sign_up))
        .route(
            "/identity/request-verification-code",
            post(identity::request_verification_code),
        )
        .route("/identity/sign-in", post(identity::sign_in))
        .route("/identity/refresh-token", post(identity::refresh_token))
        .route("/identity/sign-out", post(identity::sign_out))
        .route("/identity/forgot-password", post(identity::forgot_password))
        .route(
            "/identity/confirm-forgot-password",
            post(identity::confirm_forgot_password),
        );

    let protected_routes = Router::new()
        .route("/users/me", get(users::get_current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/v1", identity_routes.merge(protected_routes))
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Uuid::new_v4().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    rate_limit_middleware,
                ))
                .layer(cors)
                .layer(middleware::from_fn(options_short_circuit)),
        )
        .with_state(state)
}

/// Answer any `OPTIONS` request with an empty 200 before routing.
///
/// Preflights are already handled by the CORS layer above; this catches the
/// bare `OPTIONS` requests that would otherwise hit method routing.
async fn options_short_circuit(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

fn make_span(request: &axum::http::Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        identity::sign_up,
        identity::confirm_sign_up,
        identity::request_verification_code,
        identity::sign_in,
        identity::refresh_token,
        identity::sign_out,
        identity::forgot_password,
        identity::confirm_forgot_password,
        users::get_current_user,
        health::health,
    ),
    components(
        schemas(
            identity::SignUpRequest,
            identity::ConfirmSignUpRequest,
            identity::EmailRequest,
            identity::SignInRequest,
            identity::ConfirmForgotPasswordRequest,
            identity::SignInResponse,
            users::UserMeResponse,
            health::ReadyResponse,
            health::HealthChecks,
        )
    ),
    tags(
        (name = "Identity", description = "Account lifecycle against the identity provider"),
        (name = "Users", description = "Authenticated user information"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::cognito::CognitoClient;
    use crate::rate_limit::RateLimiter;
    use crate::state::AuthConfig;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
    use tower::ServiceExt;

    const TEST_ORIGIN: &str = "https://app.example.test";

    fn test_state() -> AppState {
        let auth_config = AuthConfig::new(
            "http://unreachable.invalid/jwks.json",
            "https://pool.example.test",
        );
        let provider = CognitoClient::new(
            "http://unreachable.invalid",
            "pool-id",
            "client-id",
            "client-secret",
        )
        .unwrap();
        AppState::new(auth_config, provider)
    }

    fn test_app() -> Router {
        router(
            test_state(),
            vec![HeaderValue::from_static(TEST_ORIGIN)],
        )
    }

    fn http_request_builder() -> axum::http::request::Builder {
        axum::http::Request::builder()
    }

    fn get_request(uri: &str) -> Request {
        http_request_builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn protected_route_without_header_is_401() {
        let response = test_app()
            .oneshot(get_request("/v1/users/me"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_with_bad_header_shape_is_400() {
        for value in ["Token abc", "bearer abc", "Bearer a b", "Bearer"] {
            let request = http_request_builder()
                .uri("/v1/users/me")
                .header(AUTHORIZATION, value)
                .body(Body::empty())
                .unwrap();
            let response = test_app().oneshot(request).await.unwrap();
            assert_eq!(
                response.status(),
                StatusCode::BAD_REQUEST,
                "accepted header: {value}"
            );
        }
    }

    #[tokio::test]
    async fn options_anywhere_returns_200_with_no_body() {
        let request = http_request_builder()
            .method(Method::OPTIONS)
            .uri("/v1/identity/sign-in")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn cors_echoes_allowlisted_origin() {
        let request = http_request_builder()
            .uri("/no-such-route")
            .header(ORIGIN, TEST_ORIGIN)
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some(TEST_ORIGIN)
        );
    }

    #[tokio::test]
    async fn cors_omits_header_for_unknown_origin() {
        let request = http_request_builder()
            .uri("/no-such-route")
            .header(ORIGIN, "https://unlisted.example")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
        // Request still proceeds; the browser is the one that blocks.
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = test_app()
            .oneshot(get_request("/no-such-route"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn exhausted_bucket_returns_429() {
        // No refill: two requests drain the bucket, the third is rejected.
        let state = test_state().with_rate_limiter(RateLimiter::new(0.0, 2));
        let app = router(state, vec![HeaderValue::from_static(TEST_ORIGIN)]);

        for _ in 0..2 {
            let response = app.clone().oneshot(get_request("/no-such-route")).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        let response = app.clone().oneshot(get_request("/no-such-route")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn missing_session_cookies_on_refresh_is_400() {
        let request = http_request_builder()
            .method(Method::POST)
            .uri("/v1/identity/refresh-token")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_signup_body_is_400() {
        let request = http_request_builder()
            .method(Method::POST)
            .uri("/v1/identity/signup")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"username\":42}"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
