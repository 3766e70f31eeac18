//! API middleware
//!
//! Shared application state, the JSON error type, and session resolution:
//! every request passes through `resolve_session`, which turns the signed
//! session cookie into a request-scoped `CurrentUser`.

use axum::{
    extract::{rejection::FormRejection, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxAuthorRepository, SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{DocumentId, User};
use crate::services::{
    AuthorService, PostService, PostServiceError, SessionSigner, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub author_service: Arc<AuthorService>,
    pub signer: Arc<SessionSigner>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool
    pub fn new(pool: DynDatabasePool, config: Config) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let author_repo = SqlxAuthorRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());

        let user_service = Arc::new(UserService::with_session_ttl(
            user_repo.clone(),
            session_repo,
            config.session.ttl_seconds,
        ));
        let post_service = Arc::new(PostService::new(post_repo, author_repo.clone(), user_repo));
        let author_service = Arc::new(AuthorService::new(author_repo));
        let signer = Arc::new(SessionSigner::new(&config.session.secret)?);

        Ok(Self {
            config: Arc::new(config),
            user_service,
            post_service,
            author_service,
            signer,
        })
    }
}

/// The logged-in user for this request, if any.
///
/// Always present in request extensions after `resolve_session`; extracting
/// it never fails.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn id(&self) -> Option<&DocumentId> {
        self.0.as_ref().map(|user| &user.id)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Error response body: `{"err": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub err: String,
}

/// Error returned by handlers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.message);
        }
        (self.status, Json(ErrorBody { err: self.message })).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::PostNotFound(_) | PostServiceError::AuthorNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            PostServiceError::Forbidden => ApiError::forbidden("FORBIDDEN"),
            PostServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::internal_error(format!("{:#}", e))
    }
}

/// Urlencoded form body that treats a request without a form as empty.
///
/// Bodies are not validated, so a bare `POST` behaves like one whose fields
/// were all left out. A malformed form body is still rejected, as a JSON
/// `ApiError`.
#[derive(Debug)]
pub struct FormOrEmpty<T>(pub T);

impl<T, S> FromRequest<S> for FormOrEmpty<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(Form(value)) => Ok(Self(value)),
            Err(FormRejection::InvalidFormContentType(_)) => Ok(Self(T::default())),
            Err(rejection) => Err(ApiError::new(rejection.status(), rejection.body_text())),
        }
    }
}

/// Parse an id from the URL. Anything that is not a document id cannot name
/// a document, so it is reported as not found.
pub fn parse_path_id(raw: &str, what: &str) -> Result<DocumentId, ApiError> {
    DocumentId::parse(raw).ok_or_else(|| ApiError::not_found(format!("no {} with id {}", what, raw)))
}

/// Find a cookie's value across all `Cookie` headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// The verified session id carried by the request's cookie, if any
pub fn session_id_from_headers(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let value = extract_cookie(headers, &state.config.session.cookie_name)?;
    state.signer.verify(&value)
}

/// `Set-Cookie` header that stores a signed session id
pub fn session_cookie(state: &AppState, session_id: &str) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.session.cookie_name,
        state.signer.sign(session_id),
        state.user_service.session_ttl().num_seconds().max(0)
    );
    set_cookie_headers(&cookie)
}

/// `Set-Cookie` header that removes the session cookie
pub fn clear_session_cookie(state: &AppState) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.config.session.cookie_name
    );
    set_cookie_headers(&cookie)
}

fn set_cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::internal_error(format!("Invalid cookie header: {}", e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

/// Session middleware
///
/// Resolves the current user once per request. An absent, unsigned or
/// tampered cookie, or an unknown or expired session, yields no user.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match session_id_from_headers(&state, request.headers()) {
        Some(session_id) => state.user_service.current_user(&session_id).await,
        None => None,
    };
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_extract_cookie_by_name() {
        let headers = headers_with_cookie("theme=dark; gitnaughty.sid=abc.def; lang=en");
        assert_eq!(
            extract_cookie(&headers, "gitnaughty.sid"),
            Some("abc.def".to_string())
        );
        assert_eq!(extract_cookie(&headers, "lang"), Some("en".to_string()));
    }

    #[test]
    fn test_extract_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(extract_cookie(&headers, "b"), Some("2".to_string()));
    }

    #[test]
    fn test_extract_cookie_missing() {
        assert!(extract_cookie(&HeaderMap::new(), "sid").is_none());
        let headers = headers_with_cookie("sidx=1; xsid=2");
        assert!(extract_cookie(&headers, "sid").is_none());
    }

    #[test]
    fn test_parse_path_id() {
        let id = DocumentId::new();
        assert_eq!(parse_path_id(&id.to_string(), "post").unwrap(), id);

        let err = parse_path_id("nope", "post").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "no post with id nope");
    }

    #[test]
    fn test_service_errors_map_to_statuses() {
        let forbidden: ApiError = PostServiceError::Forbidden.into();
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let missing: ApiError = PostServiceError::AuthorNotFound("x".to_string()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "no author with id x");

        let exists: ApiError = UserServiceError::UserExists("a@b".to_string()).into();
        assert_eq!(exists.status, StatusCode::CONFLICT);

        let internal: ApiError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
