// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! Decoded claims and the authenticated-user representation.

use serde_json::{Map, Value};

use super::error::AuthError;

/// Authenticated user information extracted from a verified JWT.
///
/// This is the per-request value attached by the token verifier and read by
/// downstream handlers. It holds the full decoded payload plus the claims
/// the gateway itself cares about; it is dropped when the request completes.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub sub: String,

    /// Email, when the token carries one
    pub email: Option<String>,

    /// Pool-side username, when the token carries one
    pub username: Option<String>,

    /// Token issuer
    pub issuer: String,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,

    /// Full decoded payload, claim name to value
    pub claims: Map<String, Value>,
}

impl AuthenticatedUser {
    /// Build from a verified token payload.
    ///
    /// Fails with `MalformedToken` when the payload is not an object or has
    /// no `sub` claim - every provider-issued token carries one.
    pub fn from_payload(payload: Value) -> Result<Self, AuthError> {
        let claims = match payload {
            Value::Object(map) => map,
            _ => return Err(AuthError::MalformedToken),
        };

        let sub = claims
            .get("sub")
            .and_then(Value::as_str)
            .ok_or(AuthError::MalformedToken)?
            .to_string();

        let email = claims
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);

        // Cognito puts the username under `cognito:username` on ID tokens
        // and `username` on access tokens.
        let username = claims
            .get("cognito:username")
            .or_else(|| claims.get("username"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let issuer = claims
            .get("iss")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let expires_at = claims.get("exp").and_then(Value::as_i64).unwrap_or(0);

        Ok(Self {
            sub,
            email,
            username,
            issuer,
            expires_at,
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_payload_extracts_standard_claims() {
        let payload = json!({
            "sub": "user-123",
            "email": "alice@example.com",
            "cognito:username": "alice",
            "iss": "https://pool.example.test",
            "exp": 1_700_003_600,
            "iat": 1_700_000_000,
        });

        let user = AuthenticatedUser::from_payload(payload).unwrap();
        assert_eq!(user.sub, "user-123");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.issuer, "https://pool.example.test");
        assert_eq!(user.expires_at, 1_700_003_600);
        assert_eq!(user.claims["iat"], 1_700_000_000);
    }

    #[test]
    fn from_payload_falls_back_to_access_token_username() {
        let payload = json!({
            "sub": "user-123",
            "username": "alice",
        });
        let user = AuthenticatedUser::from_payload(payload).unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));
    }

    #[test]
    fn from_payload_requires_sub() {
        let payload = json!({ "email": "alice@example.com" });
        let result = AuthenticatedUser::from_payload(payload);
        assert!(matches!(result, Err(AuthError::MalformedToken)));
    }

    #[test]
    fn from_payload_rejects_non_object() {
        let result = AuthenticatedUser::from_payload(json!("not-an-object"));
        assert!(matches!(result, Err(AuthError::MalformedToken)));
    }
}
