// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup; a missing required variable terminates the process before any
//! traffic is served.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AWS_REGION` | Region of the Cognito user pool | Required |
//! | `COGNITO_USER_POOL_ID` | User pool identifier | Required |
//! | `COGNITO_CLIENT_ID` | App client identifier | Required |
//! | `COGNITO_CLIENT_SECRET` | App client secret (keys the credential hash) | Required |
//! | `COGNITO_ENDPOINT` | Provider API base URL | `https://cognito-idp.{region}.amazonaws.com` |
//! | `COGNITO_ISSUER` | Expected JWT issuer claim | `{endpoint}/{pool}` |
//! | `COGNITO_JWKS_URL` | Signing key set endpoint | `{issuer}/.well-known/jwks.json` |
//! | `COGNITO_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `ALLOWED_ORIGINS` | Comma-separated CORS origin allowlist | local dev origins |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the Cognito region.
pub const AWS_REGION_ENV: &str = "AWS_REGION";

/// Environment variable name for the user pool identifier.
pub const USER_POOL_ID_ENV: &str = "COGNITO_USER_POOL_ID";

/// Environment variable name for the app client identifier.
pub const CLIENT_ID_ENV: &str = "COGNITO_CLIENT_ID";

/// Environment variable name for the app client secret.
///
/// The secret keys the per-call credential hash, so it must never be logged.
pub const CLIENT_SECRET_ENV: &str = "COGNITO_CLIENT_SECRET";

/// Environment variable name for the provider API base URL override.
pub const ENDPOINT_ENV: &str = "COGNITO_ENDPOINT";

/// Environment variable name for the expected JWT issuer override.
pub const ISSUER_ENV: &str = "COGNITO_ISSUER";

/// Environment variable name for the JWKS endpoint override.
pub const JWKS_URL_ENV: &str = "COGNITO_JWKS_URL";

/// Environment variable name for the expected JWT audience.
pub const AUDIENCE_ENV: &str = "COGNITO_AUDIENCE";

/// Environment variable name for the CORS origin allowlist.
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";

/// Default CORS allowlist used when `ALLOWED_ORIGINS` is not set.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// Read an environment variable, falling back to a default.
pub fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
