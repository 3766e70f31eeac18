//! User service
//!
//! Account creation, credential checks and the server-side session lifecycle:
//! - `register` stores a user with an Argon2id password hash
//! - `authenticate` resolves a user only when the password verifies
//! - `login` / `start_session` open a session with a fixed TTL
//! - `current_user` resolves a session id to its user, or to nobody
//! - `logout` deletes the session

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, DocumentId, Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (unknown email or wrong password)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Email already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl: Duration,
}

impl UserService {
    /// Create a user service whose sessions last `ttl_seconds`
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Session lifetime, also used as the cookie's max-age
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Create a user from a raw email and password.
    ///
    /// The password is hashed before storage. A taken email is reported as
    /// `UserExists`, whether caught by the lookup or by the unique index.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.email, password_hash);

        match self.user_repo.create(&user).await {
            Ok(created) => {
                tracing::info!(user_id = %created.id, "User registered");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                user.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the user with this email if the password verifies.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserServiceError> {
        let user = match self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to get user by email")?
        {
            Some(user) => user,
            None => return Ok(None),
        };

        let valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;

        Ok(valid.then_some(user))
    }

    /// Authenticate and open a session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, UserServiceError> {
        let user = self.authenticate(email, password).await?.ok_or_else(|| {
            UserServiceError::AuthenticationError("Invalid email or password".to_string())
        })?;

        self.start_session(&user.id).await
    }

    /// Open a new session for a user
    pub async fn start_session(&self, user_id: &DocumentId) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            user_id: *user_id,
            expires_at: now + self.session_ttl,
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::debug!(user_id = %user_id, "Session started");
        Ok(created)
    }

    /// Delete a session. Unknown ids are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Resolve a session id to its user.
    ///
    /// Missing or expired sessions resolve to `None`; expired ones are deleted
    /// on the way out.
    pub async fn validate_session(&self, session_id: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(session_id).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(&session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Like `validate_session`, but a lookup failure is logged and treated as
    /// no user.
    pub async fn current_user(&self, session_id: &str) -> Option<User> {
        match self.validate_session(session_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Failed to resolve session: {}", e);
                None
            }
        }
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}
