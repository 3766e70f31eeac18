//! Post endpoints
//!
//! Mutations are owner-only: the current user's id must equal the post's
//! author reference.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{parse_path_id, ApiError, AppState, CurrentUser, FormOrEmpty};
use crate::api::responses::PostResponse;
use crate::models::{CreatePostInput, Post, UpdatePostInput};
use crate::services::PostServiceError;

#[derive(Debug, Default, Deserialize)]
pub struct CreatePostForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostForm {
    pub text: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/authors/{author_id}", put(assign_author))
}

/// GET /api/posts
async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let populate = state.config.compat.populate_post_list;
    let posts = state.post_service.list(populate).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    current: CurrentUser,
    FormOrEmpty(form): FormOrEmpty<CreatePostForm>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .create(CreatePostInput {
            author_id: current.id().copied(),
            text: form.text,
        })
        .await?;
    Ok(Json(post.into()))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_path_id(&id, "post")?;
    Ok(Json(state.post_service.get(&id).await?))
}

/// PUT /api/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    FormOrEmpty(form): FormOrEmpty<UpdatePostForm>,
) -> Result<Json<PostResponse>, ApiError> {
    let id = parse_path_id(&id, "post")?;
    let input = UpdatePostInput { text: form.text };

    match state.post_service.update(&id, input, current.id()).await {
        Ok(post) => Ok(Json(post.into())),
        Err(PostServiceError::Forbidden) => Err(ApiError::forbidden("NOT AUTHORIZED")),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /api/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, "post")?;
    state.post_service.delete(&id, current.id()).await?;
    tracing::info!(post_id = %id, "Post deleted");
    Ok((StatusCode::OK, "DELETED"))
}

/// PUT /api/posts/{id}/authors/{author_id}
async fn assign_author(
    State(state): State<AppState>,
    Path((post_id, author_id)): Path<(String, String)>,
) -> Result<Json<Post>, ApiError> {
    let author_id = parse_path_id(&author_id, "author")?;
    let post_id = parse_path_id(&post_id, "post")?;
    Ok(Json(state.post_service.assign_author(&post_id, &author_id).await?))
}
