//! Author endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, FormOrEmpty};
use crate::models::Author;

#[derive(Debug, Default, Deserialize)]
pub struct CreateAuthorForm {
    #[serde(default)]
    pub name: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/authors", get(list_authors).post(create_author))
}

/// GET /api/authors
async fn list_authors(State(state): State<AppState>) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.author_service.list().await?))
}

/// POST /api/authors
async fn create_author(
    State(state): State<AppState>,
    FormOrEmpty(form): FormOrEmpty<CreateAuthorForm>,
) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.author_service.create(form.name).await?))
}
