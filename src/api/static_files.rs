//! HTML views and the public directory
//!
//! `/` and `/profile` serve files from `<public_dir>/views`; everything that
//! no route claims falls through to the public directory itself.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use std::path::Path;
use tokio::fs;
use tower_http::services::ServeDir;

use crate::api::middleware::{ApiError, AppState, CurrentUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/profile", get(profile))
}

/// Service for files in the public directory
pub fn public_files(public_dir: &Path) -> ServeDir {
    ServeDir::new(public_dir)
}

/// GET /
async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    serve_view(&state, "index.html").await
}

/// GET /profile
async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ApiError> {
    if user.is_none() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(serve_view(&state, "profile.html").await?.into_response())
}

async fn serve_view(state: &AppState, name: &str) -> Result<Html<String>, ApiError> {
    let path = state.config.static_files.public_dir.join("views").join(name);
    match fs::read_to_string(&path).await {
        Ok(contents) => Ok(Html(contents)),
        Err(e) => {
            tracing::warn!("Failed to read view {:?}: {}", path, e);
            Err(ApiError::not_found(format!("{} not found", name)))
        }
    }
}
