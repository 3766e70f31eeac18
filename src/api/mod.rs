//! API layer - HTTP handlers and routing
//!
//! - page routes: `/`, `/profile`, signup, login, logout
//! - JSON API under `/api`: posts, comments, authors, current user
//! - everything else: files from the public directory

pub mod auth;
pub mod authors;
pub mod comments;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod static_files;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, CurrentUser};

/// Build the `/api` router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::api_router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(authors::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_origin = state
        .config
        .server
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE])
        .allow_credentials(true);

    let public_files = static_files::public_files(&state.config.static_files.public_dir);

    Ok(Router::new()
        .merge(static_files::router())
        .merge(auth::router())
        .nest("/api", build_api_router())
        .fallback_service(public_files)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_session,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
