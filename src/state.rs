// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

use std::sync::Arc;

use crate::auth::JwksManager;
use crate::providers::cognito::CognitoClient;
use crate::rate_limit::RateLimiter;

/// Authentication configuration shared by the verifier.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWKS manager for key fetching.
    pub jwks: Arc<JwksManager>,
    /// Expected issuer (the user pool URL).
    pub issuer: String,
    /// Expected audience (optional; access tokens carry no `aud`).
    pub audience: Option<String>,
}

impl AuthConfig {
    /// Create a new auth configuration.
    pub fn new(jwks_url: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            jwks: Arc::new(JwksManager::new(jwks_url)),
            issuer: issuer.into(),
            audience: None,
        }
    }

    /// Set the expected audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Shared application state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth_config: AuthConfig,
    pub provider: Arc<CognitoClient>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(auth_config: AuthConfig, provider: CognitoClient) -> Self {
        Self {
            auth_config,
            provider: Arc::new(provider),
            rate_limiter: Arc::new(RateLimiter::default()),
        }
    }

    /// Replace the default rate limiter (used by tests to tighten limits).
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Arc::new(limiter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_audience_defaults_to_none() {
        let config = AuthConfig::new(
            "https://pool.example.test/.well-known/jwks.json",
            "https://pool.example.test",
        );
        assert!(config.audience.is_none());
        assert_eq!(config.issuer, "https://pool.example.test");

        let config = config.with_audience("my-client");
        assert_eq!(config.audience.as_deref(), Some("my-client"));
    }
}
