//! Authentication endpoints
//!
//! - POST /users - sign up, log in, redirect home
//! - POST /login - log in, redirect home
//! - GET /logout - log out, redirect home
//! - GET /api/users/current - the logged-in user

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{
    clear_session_cookie, session_cookie, session_id_from_headers, ApiError, AppState, CurrentUser,
    FormOrEmpty,
};
use crate::config::LoginFailureMode;
use crate::models::{CreateUserInput, User};
use crate::services::UserServiceError;

/// Form body for signup and login, as the browser client posts it
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(rename = "user[email]", default)]
    pub email: String,
    #[serde(rename = "user[password]", default)]
    pub password: String,
}

/// Page-level auth routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
}

/// API auth routes
pub fn api_router() -> Router<AppState> {
    Router::new().route("/users/current", get(current_user))
}

/// POST /users
async fn signup(
    State(state): State<AppState>,
    FormOrEmpty(form): FormOrEmpty<CredentialsForm>,
) -> Result<Response, ApiError> {
    let user = state
        .user_service
        .register(CreateUserInput {
            email: form.email,
            password: form.password,
        })
        .await?;

    let session = state.user_service.start_session(&user.id).await?;
    let headers = session_cookie(&state, &session.id)?;

    Ok((headers, Redirect::to("/")).into_response())
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    FormOrEmpty(form): FormOrEmpty<CredentialsForm>,
) -> Result<Response, ApiError> {
    match state.user_service.login(&form.email, &form.password).await {
        Ok(session) => {
            let headers = session_cookie(&state, &session.id)?;
            Ok((headers, Redirect::to("/")).into_response())
        }
        Err(UserServiceError::AuthenticationError(msg)) => {
            tracing::debug!("Login failed");
            match state.config.compat.login_failure {
                LoginFailureMode::Redirect => Ok(Redirect::to("/").into_response()),
                LoginFailureMode::Reject => Err(ApiError::unauthorized(msg)),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(session_id) = session_id_from_headers(&state, &headers) {
        if let Err(e) = state.user_service.logout(&session_id).await {
            tracing::warn!("Failed to delete session on logout: {}", e);
        }
    }

    let headers = clear_session_cookie(&state)?;
    Ok((headers, Redirect::to("/")).into_response())
}

/// GET /api/users/current
async fn current_user(CurrentUser(user): CurrentUser) -> Result<Json<User>, ApiError> {
    user.map(Json)
        .ok_or_else(|| ApiError::not_found("Please Login"))
}
