// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! Cognito user-pool client for the identity lifecycle.
//!
//! Speaks the provider's JSON wire protocol directly: one POST per
//! operation, the action named in the `X-Amz-Target` header. Every
//! operation that references a username carries a secret hash binding the
//! call to this app client, so a credential captured for one client cannot
//! be replayed against another.
//!
//! No retries: a failed provider call surfaces as a single user-visible
//! error.

use std::time::Duration;

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::debug;

use crate::config::{
    env_or_default, AWS_REGION_ENV, CLIENT_ID_ENV, CLIENT_SECRET_ENV, ENDPOINT_ENV,
    USER_POOL_ID_ENV,
};

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("identity provider configuration missing: {0}")]
    MissingConfig(String),

    #[error("identity provider request failed: {0}")]
    Request(String),

    #[error("{code}: {message}")]
    Api { code: String, message: String },

    #[error("identity provider response was invalid: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// True when the provider rejected the caller's credentials, as opposed
    /// to failing on its own account.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            ProviderError::Api { code, .. }
                if code == "NotAuthorizedException" || code == "UserNotFoundException"
        )
    }
}

/// Token set returned by the provider on sign-in and refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub id_token: String,
    /// Absent on refresh exchanges; the original refresh token stays valid.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Client for the managed identity provider.
#[derive(Debug, Clone)]
pub struct CognitoClient {
    endpoint: String,
    user_pool_id: String,
    client_id: String,
    client_secret: String,
    http: Client,
}

impl CognitoClient {
    /// Create a client against an explicit endpoint (tests point this at a
    /// local mock).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        user_pool_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            user_pool_id: user_pool_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http,
        })
    }

    /// Build the client from the environment.
    ///
    /// # Errors
    ///
    /// Returns `MissingConfig` when a required variable is unset.
    pub fn from_env() -> Result<Self, ProviderError> {
        let region = env_required(AWS_REGION_ENV)?;
        let endpoint = env_or_default(
            ENDPOINT_ENV,
            &format!("https://cognito-idp.{region}.amazonaws.com"),
        );
        Self::new(
            endpoint,
            env_required(USER_POOL_ID_ENV)?,
            env_required(CLIENT_ID_ENV)?,
            env_required(CLIENT_SECRET_ENV)?,
        )
    }

    /// The app client identifier this client binds its calls to.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn secret_hash(&self, username: &str) -> Result<String, ProviderError> {
        compute_secret_hash(&self.client_id, &self.client_secret, username)
    }

    /// Register a new pending account.
    pub async fn sign_up(
        &self,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), ProviderError> {
        let secret_hash = self.secret_hash(username)?;
        self.call(
            "SignUp",
            json!({
                "ClientId": self.client_id,
                "SecretHash": secret_hash,
                "Username": username,
                "Password": password,
                "UserAttributes": [
                    { "Name": "email", "Value": username },
                    { "Name": "given_name", "Value": first_name },
                    { "Name": "family_name", "Value": last_name },
                ],
            }),
        )
        .await?;
        Ok(())
    }

    /// Activate a pending account with the emailed confirmation code.
    pub async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), ProviderError> {
        let secret_hash = self.secret_hash(email)?;
        self.call(
            "ConfirmSignUp",
            json!({
                "ClientId": self.client_id,
                "SecretHash": secret_hash,
                "Username": email,
                "ConfirmationCode": code,
            }),
        )
        .await?;
        Ok(())
    }

    /// Resend the confirmation code for a pending account.
    pub async fn resend_confirmation_code(&self, email: &str) -> Result<(), ProviderError> {
        let secret_hash = self.secret_hash(email)?;
        self.call(
            "ResendConfirmationCode",
            json!({
                "ClientId": self.client_id,
                "SecretHash": secret_hash,
                "Username": email,
            }),
        )
        .await?;
        Ok(())
    }

    /// Authenticate with username and password (admin-initiated grant).
    pub async fn initiate_password_auth(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticationResult, ProviderError> {
        let secret_hash = self.secret_hash(username)?;
        let response = self
            .call(
                "AdminInitiateAuth",
                json!({
                    "AuthFlow": "ADMIN_USER_PASSWORD_AUTH",
                    "ClientId": self.client_id,
                    "UserPoolId": self.user_pool_id,
                    "AuthParameters": {
                        "USERNAME": username,
                        "PASSWORD": password,
                        "SECRET_HASH": secret_hash,
                    },
                }),
            )
            .await?;
        authentication_result(response)
    }

    /// Exchange a refresh token for a new token set, keyed on the subject.
    pub async fn initiate_refresh_auth(
        &self,
        refresh_token: &str,
        user_sub: &str,
    ) -> Result<AuthenticationResult, ProviderError> {
        let secret_hash = self.secret_hash(user_sub)?;
        let response = self
            .call(
                "AdminInitiateAuth",
                json!({
                    "AuthFlow": "REFRESH_TOKEN_AUTH",
                    "ClientId": self.client_id,
                    "UserPoolId": self.user_pool_id,
                    "AuthParameters": {
                        "REFRESH_TOKEN": refresh_token,
                        "SECRET_HASH": secret_hash,
                    },
                }),
            )
            .await?;
        authentication_result(response)
    }

    /// Invalidate every active session for the subject.
    pub async fn global_sign_out(&self, user_sub: &str) -> Result<(), ProviderError> {
        self.call(
            "AdminUserGlobalSignOut",
            json!({
                "UserPoolId": self.user_pool_id,
                "Username": user_sub,
            }),
        )
        .await?;
        Ok(())
    }

    /// Trigger the provider-side password-reset code dispatch.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ProviderError> {
        let secret_hash = self.secret_hash(email)?;
        self.call(
            "ForgotPassword",
            json!({
                "ClientId": self.client_id,
                "SecretHash": secret_hash,
                "Username": email,
            }),
        )
        .await?;
        Ok(())
    }

    /// Finalize a password reset with the emailed code.
    pub async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ProviderError> {
        let secret_hash = self.secret_hash(email)?;
        self.call(
            "ConfirmForgotPassword",
            json!({
                "ClientId": self.client_id,
                "SecretHash": secret_hash,
                "Username": email,
                "ConfirmationCode": code,
                "Password": new_password,
            }),
        )
        .await?;
        Ok(())
    }

    /// Perform one provider call and return the decoded response body.
    async fn call(&self, action: &str, body: Value) -> Result<Value, ProviderError> {
        debug!(action, "calling identity provider");
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{action}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid JSON body: {e}")))
    }
}

/// Derive the keyed credential hash binding a username to this app client.
///
/// base64(HMAC-SHA256(key = client secret, message = username || client id)).
/// Deterministic; recomputed for every provider call, never stored.
///
/// # Errors
///
/// Fails only when the client secret is absent.
pub fn compute_secret_hash(
    client_id: &str,
    client_secret: &str,
    username: &str,
) -> Result<String, ProviderError> {
    if client_secret.is_empty() {
        return Err(ProviderError::MissingConfig(
            "client secret is empty".to_string(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(client_secret.as_bytes())
        .map_err(|e| ProviderError::MissingConfig(format!("client secret is malformed: {e}")))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(Base64::encode_string(&mac.finalize().into_bytes()))
}

fn authentication_result(response: Value) -> Result<AuthenticationResult, ProviderError> {
    let result = response
        .get("AuthenticationResult")
        .cloned()
        .ok_or_else(|| {
            ProviderError::InvalidResponse("missing AuthenticationResult in response".to_string())
        })?;
    serde_json::from_value(result).map_err(|e| {
        ProviderError::InvalidResponse(format!("malformed AuthenticationResult: {e}"))
    })
}

/// Decode a provider error body (`{"__type": ..., "message": ...}`).
fn parse_api_error(status: u16, body: &str) -> ProviderError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP{status}"));
    // Cognito is inconsistent about the message key's casing.
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .unwrap_or("no detail provided")
        .to_string();
    ProviderError::Api { code, message }
}

fn env_required(name: &str) -> Result<String, ProviderError> {
    std::env::var(name).map_err(|_| ProviderError::MissingConfig(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_ID: &str = "test-client-id";
    const CLIENT_SECRET: &str = "test-client-secret";

    #[test]
    fn secret_hash_matches_known_vector() {
        let hash = compute_secret_hash(CLIENT_ID, CLIENT_SECRET, "alice@example.com").unwrap();
        assert_eq!(hash, "iRwBfVAV+whSesEySXuONTqs2khFb2snLZsGkct97Nc=");
    }

    #[test]
    fn secret_hash_is_deterministic() {
        let first = compute_secret_hash(CLIENT_ID, CLIENT_SECRET, "alice@example.com").unwrap();
        let second = compute_secret_hash(CLIENT_ID, CLIENT_SECRET, "alice@example.com").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn secret_hash_changes_with_any_input() {
        let base = compute_secret_hash(CLIENT_ID, CLIENT_SECRET, "alice@example.com").unwrap();

        let other_user =
            compute_secret_hash(CLIENT_ID, CLIENT_SECRET, "bob@example.com").unwrap();
        assert_ne!(base, other_user);
        assert_eq!(other_user, "ejWkYU4SeJv4okT4wQoypG5AozNNR5SWwfbqChxLdIM=");

        let other_client =
            compute_secret_hash("other-client-id", CLIENT_SECRET, "alice@example.com").unwrap();
        assert_ne!(base, other_client);

        let other_secret =
            compute_secret_hash(CLIENT_ID, "other-secret", "alice@example.com").unwrap();
        assert_ne!(base, other_secret);
    }

    #[test]
    fn secret_hash_requires_a_secret() {
        let result = compute_secret_hash(CLIENT_ID, "", "alice@example.com");
        assert!(matches!(result, Err(ProviderError::MissingConfig(_))));
    }

    #[test]
    fn parse_api_error_reads_type_and_message() {
        let err = parse_api_error(
            400,
            r#"{"__type":"NotAuthorizedException","message":"Incorrect username or password."}"#,
        );
        assert!(err.is_unauthenticated());
        assert_eq!(
            err.to_string(),
            "NotAuthorizedException: Incorrect username or password."
        );
    }

    #[test]
    fn parse_api_error_tolerates_non_json_bodies() {
        let err = parse_api_error(502, "Bad Gateway");
        match err {
            ProviderError::Api { code, message } => {
                assert_eq!(code, "HTTP502");
                assert_eq!(message, "no detail provided");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn upstream_errors_are_not_unauthenticated() {
        let err = parse_api_error(500, r#"{"__type":"InternalErrorException","message":"boom"}"#);
        assert!(!err.is_unauthenticated());
        assert!(!ProviderError::Request("timeout".to_string()).is_unauthenticated());
    }

    #[test]
    fn authentication_result_deserializes_provider_shape() {
        let response = serde_json::json!({
            "AuthenticationResult": {
                "AccessToken": "access-xyz",
                "ExpiresIn": 3600,
                "TokenType": "Bearer",
                "IdToken": "id-abc",
                "RefreshToken": "refresh-123",
            },
            "ChallengeParameters": {},
        });
        let result = authentication_result(response).unwrap();
        assert_eq!(result.access_token, "access-xyz");
        assert_eq!(result.expires_in, 3600);
        assert_eq!(result.token_type, "Bearer");
        assert_eq!(result.refresh_token.as_deref(), Some("refresh-123"));
    }

    #[test]
    fn authentication_result_allows_missing_refresh_token() {
        let response = serde_json::json!({
            "AuthenticationResult": {
                "AccessToken": "access-xyz",
                "ExpiresIn": 3600,
                "TokenType": "Bearer",
                "IdToken": "id-abc",
            },
        });
        let result = authentication_result(response).unwrap();
        assert_eq!(result.refresh_token, None);
    }

    #[test]
    fn missing_authentication_result_is_invalid_response() {
        let response = serde_json::json!({ "ChallengeName": "SMS_MFA" });
        let result = authentication_result(response);
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }
}
