//! Database repositories
//!
//! One repository per collection. Each trait has a `Sqlx*` implementation
//! that dispatches to SQLite or MySQL queries based on the pool's driver.

pub mod author;
pub mod post;
pub mod session;
pub mod user;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{Context, Result};

use crate::models::DocumentId;

/// Parse an id column read back from the database
pub(crate) fn parse_id(raw: &str) -> Result<DocumentId> {
    DocumentId::parse(raw).with_context(|| format!("Invalid id in database: {}", raw))
}

/// Parse an optional id column read back from the database
pub(crate) fn parse_optional_id(raw: Option<String>) -> Result<Option<DocumentId>> {
    raw.as_deref().map(parse_id).transpose()
}
