// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! Token verification middleware for the protected route subtree.
//!
//! The pipeline composes rate limiting and CORS ahead of this middleware;
//! identity-lifecycle routes are mounted outside the guarded subtree and
//! never pass through it. On success the decoded claims are attached to the
//! request's extensions, readable by downstream handlers for the lifetime
//! of that request only.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::{bearer_token, verify_bearer_token};
use super::AuthError;
use crate::state::AppState;

/// Verify the bearer token and attach the authenticated user to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request.headers().get(AUTHORIZATION) {
        Some(header) => header,
        None => return AuthError::MissingAuthHeader.into_response(),
    };

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(_) => return AuthError::InvalidAuthHeader.into_response(),
    };

    let token = match bearer_token(auth_str) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    match verify_bearer_token(token, &state.auth_config).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
