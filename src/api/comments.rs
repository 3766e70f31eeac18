//! Comment endpoints
//!
//! Comments are embedded in posts and addressed through them.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{parse_path_id, ApiError, AppState, FormOrEmpty};
use crate::models::Comment;

#[derive(Debug, Default, Deserialize)]
pub struct CreateCommentForm {
    #[serde(default)]
    pub text: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/posts/{id}/comments",
        get(list_comments).post(create_comment),
    )
}

/// GET /api/posts/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let post_id = parse_path_id(&post_id, "post")?;
    Ok(Json(state.post_service.list_comments(&post_id).await?))
}

/// POST /api/posts/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    FormOrEmpty(form): FormOrEmpty<CreateCommentForm>,
) -> Result<Json<Comment>, ApiError> {
    let post_id = parse_path_id(&post_id, "post")?;
    let comment = state.post_service.add_comment(&post_id, form.text).await?;
    Ok(Json(comment))
}
