// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! # Authentication Module
//!
//! Bearer-token verification for the protected routes of the gateway.
//!
//! ## Auth Flow
//!
//! 1. Frontend signs the user in through the gateway's identity routes
//! 2. Frontend sends `Authorization: Bearer <JWT>` on protected requests
//! 3. Gateway:
//!    - Fetches the user pool's JWKS (cached with TTL)
//!    - Verifies JWT signature, expiry, issuer (and audience when configured)
//!    - Attaches the decoded claims to the request for downstream handlers
//!
//! ## Security
//!
//! - The `Bearer` scheme is matched case-sensitively; any other header shape
//!   is rejected with 400 before keys are fetched
//! - Claims live only in the request's extensions and are dropped with it
//! - A stale key set is served if a refresh fails; with no cached keys the
//!   request fails closed with 500
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod session;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::JwksManager;
pub use session::SessionCookies;
