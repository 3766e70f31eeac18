//! Post model
//!
//! A post optionally references its author by id. The reference may name an
//! `Author` or a `User`, and nothing stops it from dangling. Comments are
//! embedded and kept in arrival order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Author, Comment, DocumentId, User};

/// Post entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Author reference, serialized under `author` like an unpopulated ref
    #[serde(rename = "author")]
    pub author_id: Option<DocumentId>,
    pub text: String,
    /// Embedded comments, oldest first
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post with a fresh id and no comments
    pub fn new(author_id: Option<DocumentId>, text: String) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            author_id,
            text,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Ownership check used for every post mutation.
    ///
    /// True only when both sides are present and name the same document. An
    /// anonymous requester owns nothing, and an author-less post has no owner.
    pub fn is_owned_by(&self, user_id: Option<&DocumentId>) -> bool {
        match (self.author_id.as_ref(), user_id) {
            (Some(author), Some(user)) => author == user,
            _ => false,
        }
    }
}

/// The document an author reference resolved to
#[derive(Debug, Clone)]
pub enum AuthorDocument {
    Author(Author),
    User(User),
}

/// A post together with its resolved author, when resolution was requested
#[derive(Debug, Clone)]
pub struct PopulatedPost {
    pub post: Post,
    /// `None` when the post has no author or the reference dangles
    pub author: Option<AuthorDocument>,
}

/// Input for creating a post
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub author_id: Option<DocumentId>,
    pub text: String,
}

/// Input for updating a post
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub text: Option<String>,
}
