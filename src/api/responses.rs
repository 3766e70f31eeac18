//! Shared API response types

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Author, AuthorDocument, Comment, DocumentId, PopulatedPost, User};

/// A post's `author` field: the resolved document, or the bare id when the
/// reference was not (or could not be) resolved
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AuthorField {
    Reference(DocumentId),
    Author(Author),
    User(User),
}

/// Post as returned by the list and create endpoints
#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub author: Option<AuthorField>,
    pub text: String,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PopulatedPost> for PostResponse {
    fn from(populated: PopulatedPost) -> Self {
        let PopulatedPost { post, author } = populated;
        let author = match (author, post.author_id) {
            (Some(AuthorDocument::Author(author)), _) => Some(AuthorField::Author(author)),
            (Some(AuthorDocument::User(user)), _) => Some(AuthorField::User(user)),
            (None, Some(id)) => Some(AuthorField::Reference(id)),
            (None, None) => None,
        };

        Self {
            id: post.id,
            author,
            text: post.text,
            comments: post.comments,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Post;
    use serde_json::json;

    #[test]
    fn test_populated_user_author_hides_password_hash() {
        let user = User::new("a@example.com".to_string(), "secret-hash".to_string());
        let post = Post::new(Some(user.id), "hi".to_string());
        let response = PostResponse::from(PopulatedPost {
            post,
            author: Some(AuthorDocument::User(user.clone())),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["author"]["_id"], user.id.to_string());
        assert_eq!(json["author"]["email"], "a@example.com");
        assert!(json["author"].get("password_hash").is_none());
    }

    #[test]
    fn test_unresolved_author_is_bare_id() {
        let dangling = DocumentId::new();
        let post = Post::new(Some(dangling), "hi".to_string());
        let json =
            serde_json::to_value(PostResponse::from(PopulatedPost { post, author: None })).unwrap();

        assert_eq!(json["author"], json!(dangling.to_string()));
    }

    #[test]
    fn test_no_author_is_null() {
        let post = Post::new(None, "hi".to_string());
        let json =
            serde_json::to_value(PostResponse::from(PopulatedPost { post, author: None })).unwrap();

        assert!(json["author"].is_null());
        assert_eq!(json["comments"], json!([]));
    }
}
