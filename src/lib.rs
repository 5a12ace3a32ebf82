pub mod auth;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method, Uri};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::jwt::TokenIssuer;
use crate::auth::password::Hasher;
use crate::config::Config;
use crate::db::UserStore;
use crate::error::AppError;
use crate::middleware::normalize::{normalize, recover_panic};
use crate::services::UserService;
use crate::state::{AppState, SharedState};

pub fn build_app(store: Arc<dyn UserStore>, config: &Config) -> Result<(Router, SharedState), String> {
    let hasher = Hasher::new(config.argon2_memory_kib, config.argon2_iterations)?;
    let tokens = TokenIssuer::new(config.jwt_secret.clone(), config.jwt_expires_in);

    let state: SharedState = Arc::new(AppState {
        users: UserService::new(store, hasher, tokens),
    });

    let api = if config.api_prefix.is_empty() {
        routes::user_routes()
    } else {
        Router::new().nest(&config.api_prefix, routes::user_routes())
    };

    let app = Router::new()
        .merge(api)
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(recover_panic))
        .layer(axum::middleware::from_fn(normalize))
        .route("/health", axum::routing::get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    Ok((app, state))
}

async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::not_found(format!("Cannot {method} {}", uri.path()))
}

async fn health() -> &'static str {
    "ok"
}
