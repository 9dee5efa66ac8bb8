// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! Session cookie pair handling.
//!
//! A session is two cookies that live and die together: `refreshToken` (the
//! long-lived credential exchanged for new token sets) and `userSub` (the
//! stable subject the refresh exchange is keyed on). Modelling them as one
//! value object keeps the invariant that neither cookie survives without
//! its pair.
//!
//! ## Security
//!
//! - Both cookies are `HttpOnly; Secure; SameSite=None; Path=/`
//! - The refresh token is never exposed in a response body - it travels
//!   only through these cookies
//! - Clearing reissues both cookies with `Max-Age=0` and an epoch expiry

use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

/// Cookie carrying the provider refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Cookie carrying the stable user subject.
pub const USER_SUB_COOKIE: &str = "userSub";

const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=None";

/// The session cookie pair, always read, issued and cleared together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookies {
    pub refresh_token: String,
    pub user_sub: String,
}

impl SessionCookies {
    pub fn new(refresh_token: impl Into<String>, user_sub: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            user_sub: user_sub.into(),
        }
    }

    /// Read the pair from request headers. `None` unless both cookies are
    /// present - a half-present session is treated as no session.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let refresh_token = read_cookie(headers, REFRESH_TOKEN_COOKIE)?;
        let user_sub = read_cookie(headers, USER_SUB_COOKIE)?;
        Some(Self {
            refresh_token,
            user_sub,
        })
    }

    /// Append `Set-Cookie` headers issuing both cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if a cookie value is not a valid header value.
    pub fn issue(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        let refresh = HeaderValue::from_str(&format!(
            "{REFRESH_TOKEN_COOKIE}={}; {COOKIE_ATTRIBUTES}",
            self.refresh_token
        ))?;
        let sub = HeaderValue::from_str(&format!(
            "{USER_SUB_COOKIE}={}; {COOKIE_ATTRIBUTES}",
            self.user_sub
        ))?;
        headers.append(SET_COOKIE, refresh);
        headers.append(SET_COOKIE, sub);
        Ok(())
    }

    /// Append `Set-Cookie` headers expiring both cookies.
    pub fn clear(headers: &mut HeaderMap) {
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static(
                "refreshToken=; Path=/; HttpOnly; Secure; SameSite=None; Max-Age=0; \
                 Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            ),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static(
                "userSub=; Path=/; HttpOnly; Secure; SameSite=None; Max-Age=0; \
                 Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            ),
        );
    }
}

/// Read a single cookie value from the `Cookie` request header.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}
