// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedUser};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// User's unique ID (the token's `sub` claim)
    pub user_id: String,
    /// Email, when the verified token carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Pool-side username, when the verified token carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<AuthenticatedUser> for UserMeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.sub,
            email: user.email,
            username: user.username,
        }
    }
}

/// Get the current authenticated user's information.
///
/// This endpoint returns the verified claims of the presented bearer token.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 400, description = "Malformed authorization header"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<UserMeResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn user_me_response_from_authenticated_user() {
        let user = AuthenticatedUser {
            sub: "user-123".to_string(),
            email: Some("alice@example.com".to_string()),
            username: Some("alice".to_string()),
            issuer: "https://pool.example.test".to_string(),
            expires_at: 0,
            claims: Map::new(),
        };

        let response: UserMeResponse = user.into();
        assert_eq!(response.user_id, "user-123");
        assert_eq!(response.email.as_deref(), Some("alice@example.com"));
        assert_eq!(response.username.as_deref(), Some("alice"));
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let response = UserMeResponse {
            user_id: "user-123".to_string(),
            email: None,
            username: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"user_id":"user-123"}"#);
    }
}
