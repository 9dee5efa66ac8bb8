// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! Identity lifecycle endpoints.
//!
//! Drives sign-up, confirmation, sign-in, refresh, sign-out and password
//! recovery against the managed identity provider. Every provider call is
//! bound to this app client through the credential hash computed by the
//! provider client; the session itself lives in the cookie pair issued at
//! sign-in and cleared at sign-out.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;

use crate::auth::session::{read_cookie, SessionCookies, USER_SUB_COOKIE};
use crate::error::ApiError;
use crate::providers::cognito::{AuthenticationResult, ProviderError};
use crate::state::AppState;

/// Request body for creating a new account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpRequest {
    /// Email address used as the account's username.
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Request body for confirming a pending account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmSignUpRequest {
    pub email: String,
    #[serde(rename = "confirmationCode")]
    pub confirmation_code: String,
}

/// Request body carrying just an email address.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

/// Request body for signing in.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// Request body for finalizing a password reset.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmForgotPasswordRequest {
    pub email: String,
    #[serde(rename = "confirmationCode")]
    pub confirmation_code: String,
    pub password: String,
}

/// Token set returned by sign-in and refresh.
///
/// The refresh token is deliberately absent: it travels only through the
/// `HttpOnly` session cookies.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub access_token: String,
    pub id_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<AuthenticationResult> for SignInResponse {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            access_token: result.access_token,
            id_token: result.id_token,
            token_type: result.token_type,
            expires_in: result.expires_in,
        }
    }
}

/// Create a pending account.
#[utoipa::path(
    post,
    path = "/v1/identity/signup",
    tag = "Identity",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, confirmation pending"),
        (status = 400, description = "Invalid request body"),
        (status = 500, description = "Provider call failed"),
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    state
        .provider
        .sign_up(
            &request.username,
            &request.password,
            &request.first_name,
            &request.last_name,
        )
        .await
        .map_err(|e| map_provider_error("Failed to sign up user", &e))?;

    Ok(StatusCode::CREATED)
}

/// Activate a pending account.
#[utoipa::path(
    post,
    path = "/v1/identity/confirm-signup",
    tag = "Identity",
    request_body = ConfirmSignUpRequest,
    responses(
        (status = 200, description = "Account activated"),
        (status = 400, description = "Invalid request body"),
        (status = 500, description = "Code invalid/expired or provider call failed"),
    )
)]
pub async fn confirm_sign_up(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmSignUpRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    state
        .provider
        .confirm_sign_up(&request.email, &request.confirmation_code)
        .await
        .map_err(|e| map_provider_error("Failed to confirm signup", &e))?;

    Ok(StatusCode::OK)
}

/// Resend the confirmation code.
#[utoipa::path(
    post,
    path = "/v1/identity/request-verification-code",
    tag = "Identity",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Confirmation code resent"),
        (status = 400, description = "Invalid request body"),
        (status = 500, description = "Provider call failed"),
    )
)]
pub async fn request_verification_code(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    state
        .provider
        .resend_confirmation_code(&request.email)
        .await
        .map_err(|e| map_provider_error("Failed to resend confirmation code", &e))?;

    Ok(StatusCode::OK)
}

/// Authenticate and open a session.
///
/// On success the response body carries the short-lived tokens while the
/// refresh token and subject are issued as the session cookie pair.
#[utoipa::path(
    post,
    path = "/v1/identity/sign-in",
    tag = "Identity",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Authenticated; session cookies set", body = SignInResponse),
        (status = 400, description = "Invalid request body"),
        (status = 401, description = "Bad credentials"),
        (status = 500, description = "Provider call failed"),
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<SignInResponse>), ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    let result = state
        .provider
        .initiate_password_auth(&request.username, &request.password)
        .await
        .map_err(|e| map_provider_error("Failed to authenticate user", &e))?;

    // The ID token came straight back from the provider call above, so its
    // payload is decoded without a signature check. Tokens from any other
    // source go through the verifier.
    let user_sub = decode_id_token_sub(&result.id_token)?;

    let refresh_token = result.refresh_token.clone().ok_or_else(|| {
        ApiError::internal("Provider response did not include a refresh token")
    })?;

    let mut headers = HeaderMap::new();
    SessionCookies::new(refresh_token, user_sub)
        .issue(&mut headers)
        .map_err(|_| ApiError::internal("Failed to encode session cookies"))?;

    Ok((headers, Json(result.into())))
}

/// Exchange the session's refresh token for a new token set.
#[utoipa::path(
    post,
    path = "/v1/identity/refresh-token",
    tag = "Identity",
    responses(
        (status = 200, description = "New token set", body = SignInResponse),
        (status = 400, description = "Session cookies missing"),
        (status = 401, description = "Refresh token no longer valid"),
        (status = 500, description = "Provider call failed"),
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SignInResponse>, ApiError> {
    let session = SessionCookies::from_headers(&headers)
        .ok_or_else(|| ApiError::bad_request("Missing session cookies"))?;

    let result = state
        .provider
        .initiate_refresh_auth(&session.refresh_token, &session.user_sub)
        .await
        .map_err(|e| map_provider_error("Failed to refresh token", &e))?;

    Ok(Json(result.into()))
}

/// Sign out everywhere and drop the session.
#[utoipa::path(
    post,
    path = "/v1/identity/sign-out",
    tag = "Identity",
    responses(
        (status = 200, description = "All sessions invalidated; cookies cleared"),
        (status = 400, description = "Session cookie missing"),
        (status = 500, description = "Provider call failed"),
    )
)]
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let user_sub = read_cookie(&headers, USER_SUB_COOKIE)
        .ok_or_else(|| ApiError::bad_request("Missing session cookie"))?;

    state
        .provider
        .global_sign_out(&user_sub)
        .await
        .map_err(|e| map_provider_error("Failed to sign out user", &e))?;

    let mut response_headers = HeaderMap::new();
    SessionCookies::clear(&mut response_headers);

    Ok((StatusCode::OK, response_headers))
}

/// Trigger the password-reset code dispatch.
#[utoipa::path(
    post,
    path = "/v1/identity/forgot-password",
    tag = "Identity",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Reset code dispatched"),
        (status = 400, description = "Invalid request body"),
        (status = 500, description = "Provider call failed"),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    state
        .provider
        .forgot_password(&request.email)
        .await
        .map_err(|e| map_provider_error("Failed to request password reset", &e))?;

    Ok(StatusCode::OK)
}

/// Finalize a password reset.
#[utoipa::path(
    post,
    path = "/v1/identity/confirm-forgot-password",
    tag = "Identity",
    request_body = ConfirmForgotPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid request body"),
        (status = 500, description = "Code invalid/expired or provider call failed"),
    )
)]
pub async fn confirm_forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmForgotPasswordRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    state
        .provider
        .confirm_forgot_password(&request.email, &request.confirmation_code, &request.password)
        .await
        .map_err(|e| map_provider_error("Failed to confirm forgotten password", &e))?;

    Ok(StatusCode::OK)
}

/// Map a provider failure onto the API error taxonomy.
///
/// Rejected credentials become 401; everything else is a 500 carrying the
/// provider's own detail.
fn map_provider_error(context: &str, error: &ProviderError) -> ApiError {
    warn!("{context}: {error}");
    if error.is_unauthenticated() {
        ApiError::unauthorized(format!("{context}: {error}"))
    } else {
        ApiError::internal(format!("{context}: {error}"))
    }
}

/// Extract the `sub` claim from an ID token's payload segment.
fn decode_id_token_sub(id_token: &str) -> Result<String, ApiError> {
    let parts: Vec<&str> = id_token.split('.').collect();
    if parts.len() != 3 {
        return Err(ApiError::internal("Invalid ID token"));
    }

    let payload = Base64UrlUnpadded::decode_vec(parts[1])
        .map_err(|_| ApiError::internal("Failed to decode ID token"))?;

    let claims: Value = serde_json::from_slice(&payload)
        .map_err(|_| ApiError::internal("Failed to parse ID token"))?;

    claims
        .get("sub")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::internal("Failed to extract 'sub' from ID token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    /// Build an unsigned JWT carrying the given payload JSON.
    fn unsigned_jwt(payload: &str) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"RS256","typ":"JWT"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{header_b64}.{payload_b64}.fake_signature")
    }

    #[test]
    fn decode_id_token_sub_extracts_subject() {
        let token = unsigned_jwt(r#"{"sub":"user-123","email":"alice@example.com"}"#);
        assert_eq!(decode_id_token_sub(&token).unwrap(), "user-123");
    }

    #[test]
    fn decode_id_token_sub_rejects_wrong_segment_count() {
        let result = decode_id_token_sub("only.two");
        assert!(result.is_err());
    }

    #[test]
    fn decode_id_token_sub_rejects_missing_subject() {
        let token = unsigned_jwt(r#"{"email":"alice@example.com"}"#);
        let err = decode_id_token_sub(&token).unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn decode_id_token_sub_rejects_bad_base64() {
        let result = decode_id_token_sub("a.!!!not-base64url!!!.c");
        assert!(result.is_err());
    }

    #[test]
    fn sign_in_response_uses_camel_case_fields() {
        let response = SignInResponse {
            access_token: "access-xyz".to_string(),
            id_token: "id-abc".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["accessToken"], "access-xyz");
        assert_eq!(json["idToken"], "id-abc");
        assert_eq!(json["tokenType"], "Bearer");
        assert_eq!(json["expiresIn"], 3600);
    }

    #[test]
    fn rejected_credentials_map_to_401() {
        let error = ProviderError::Api {
            code: "NotAuthorizedException".to_string(),
            message: "Incorrect username or password.".to_string(),
        };
        let api_error = map_provider_error("Failed to authenticate user", &error);
        assert_eq!(api_error.status, StatusCode::UNAUTHORIZED);
        assert!(api_error.message.contains("Incorrect username or password."));
    }

    #[test]
    fn provider_failures_map_to_500_with_detail() {
        let error = ProviderError::Api {
            code: "CodeMismatchException".to_string(),
            message: "Invalid verification code provided".to_string(),
        };
        let api_error = map_provider_error("Failed to confirm signup", &error);
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api_error
            .message
            .contains("Invalid verification code provided"));
    }
}
