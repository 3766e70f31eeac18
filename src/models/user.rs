//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DocumentId;

/// A registered account.
///
/// The password hash never leaves the server: it is skipped when the user is
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with a fresh id.
    ///
    /// The password must already be hashed; see `services::password::hash_password()`.
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: DocumentId::new(),
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Raw signup fields, before the password is hashed
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
}
