// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

use std::net::SocketAddr;

use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use ident_gateway::{
    api::router,
    config::{
        env_or_default, ALLOWED_ORIGINS_ENV, AUDIENCE_ENV, AWS_REGION_ENV,
        DEFAULT_ALLOWED_ORIGINS, ENDPOINT_ENV, HOST_ENV, ISSUER_ENV, JWKS_URL_ENV, PORT_ENV,
        USER_POOL_ID_ENV,
    },
    providers::cognito::CognitoClient,
    state::{AppState, AuthConfig},
};

#[tokio::main]
async fn main() {
    init_tracing();

    // Missing provider configuration is fatal before any traffic is served.
    let provider =
        CognitoClient::from_env().expect("Failed to load identity provider configuration");
    let auth_config = auth_config_from_env();
    let state = AppState::new(auth_config, provider);
    let app = router(state, allowed_origins());

    let host = env_or_default(HOST_ENV, "0.0.0.0");
    let port: u16 = env_or_default(PORT_ENV, "8080").parse().unwrap_or(8080);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!("Ident Gateway listening on {addr} (docs at /docs)");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    if env_or_default("LOG_FORMAT", "pretty") == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Derive verifier configuration from the pool's region and id, honoring
/// explicit overrides.
fn auth_config_from_env() -> AuthConfig {
    let region = std::env::var(AWS_REGION_ENV)
        .unwrap_or_else(|_| panic!("{AWS_REGION_ENV} must be set"));
    let pool_id = std::env::var(USER_POOL_ID_ENV)
        .unwrap_or_else(|_| panic!("{USER_POOL_ID_ENV} must be set"));

    let endpoint = env_or_default(
        ENDPOINT_ENV,
        &format!("https://cognito-idp.{region}.amazonaws.com"),
    );
    let issuer = env_or_default(ISSUER_ENV, &format!("{endpoint}/{pool_id}"));
    let jwks_url = env_or_default(JWKS_URL_ENV, &format!("{issuer}/.well-known/jwks.json"));

    Url::parse(&jwks_url).unwrap_or_else(|_| panic!("Invalid JWKS URL: {jwks_url}"));

    let config = AuthConfig::new(jwks_url, issuer);
    match std::env::var(AUDIENCE_ENV) {
        Ok(audience) if !audience.is_empty() => config.with_audience(audience),
        _ => config,
    }
}

/// Parse the CORS allowlist, rejecting unparseable origins at startup.
fn allowed_origins() -> Vec<HeaderValue> {
    env_or_default(ALLOWED_ORIGINS_ENV, DEFAULT_ALLOWED_ORIGINS)
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            Url::parse(origin)
                .unwrap_or_else(|_| panic!("Invalid origin in {ALLOWED_ORIGINS_ENV}: {origin}"));
            HeaderValue::from_str(origin)
                .unwrap_or_else(|_| panic!("Invalid origin in {ALLOWED_ORIGINS_ENV}: {origin}"))
        })
        .collect()
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install ctrl-c handler");
    info!("Shutting down");
}
