//! Post service
//!
//! Post CRUD, embedded comments, author assignment and author population.
//! Every mutation goes through `Post::is_owned_by`.

use crate::db::repositories::{AuthorRepository, PostRepository, UserRepository};
use crate::models::{
    AuthorDocument, Comment, CreatePostInput, DocumentId, PopulatedPost, Post, UpdatePostInput,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("no post with id {0}")]
    PostNotFound(String),

    #[error("no author with id {0}")]
    AuthorNotFound(String),

    /// The requester does not own the post
    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    author_repo: Arc<dyn AuthorRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        author_repo: Arc<dyn AuthorRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            post_repo,
            author_repo,
            user_repo,
        }
    }

    /// List all posts in insertion order, resolving authors when `populate` is set
    pub async fn list(&self, populate: bool) -> Result<Vec<PopulatedPost>, PostServiceError> {
        let posts = self.post_repo.list().await.context("Failed to list posts")?;

        let mut result = Vec::with_capacity(posts.len());
        for post in posts {
            if populate {
                result.push(self.populate(post).await?);
            } else {
                result.push(PopulatedPost { post, author: None });
            }
        }
        Ok(result)
    }

    /// Get a post by id with its author left as a reference
    pub async fn get(&self, id: &DocumentId) -> Result<Post, PostServiceError> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::PostNotFound(id.to_string()))
    }

    /// Create a post and return it with its author resolved
    pub async fn create(&self, input: CreatePostInput) -> Result<PopulatedPost, PostServiceError> {
        let post = Post::new(input.author_id, input.text);
        let created = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        self.populate(created).await
    }

    /// Update a post's text and return it with its author resolved. Only its
    /// owner may do this.
    pub async fn update(
        &self,
        id: &DocumentId,
        input: UpdatePostInput,
        requester: Option<&DocumentId>,
    ) -> Result<PopulatedPost, PostServiceError> {
        let mut post = self.get(id).await?;
        if !post.is_owned_by(requester) {
            tracing::debug!(post_id = %id, "Post update refused");
            return Err(PostServiceError::Forbidden);
        }

        if let Some(text) = input.text {
            post.text = text;
        }
        post.updated_at = Utc::now();

        let saved = self.post_repo.update(&post).await.context("Failed to update post")?;
        if !saved {
            return Err(PostServiceError::PostNotFound(id.to_string()));
        }
        self.populate(post).await
    }

    /// Delete a post and its comments. Only its owner may do this.
    pub async fn delete(
        &self,
        id: &DocumentId,
        requester: Option<&DocumentId>,
    ) -> Result<(), PostServiceError> {
        let post = self.get(id).await?;
        if !post.is_owned_by(requester) {
            tracing::debug!(post_id = %id, "Post delete refused");
            return Err(PostServiceError::Forbidden);
        }

        let deleted = self.post_repo.delete(id).await.context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::PostNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Comments of a post, oldest first
    pub async fn list_comments(&self, post_id: &DocumentId) -> Result<Vec<Comment>, PostServiceError> {
        Ok(self.get(post_id).await?.comments)
    }

    /// Append a comment to a post and return it
    pub async fn add_comment(
        &self,
        post_id: &DocumentId,
        text: String,
    ) -> Result<Comment, PostServiceError> {
        // Existence check first so a missing post is a 404 rather than a constraint error
        self.get(post_id).await?;

        let comment = Comment::new(text);
        self.post_repo
            .append_comment(post_id, &comment)
            .await
            .context("Failed to add comment")?;
        Ok(comment)
    }

    /// Point a post's author reference at an existing author.
    ///
    /// The author is checked before the post, so when both are missing the
    /// error names the author.
    pub async fn assign_author(
        &self,
        post_id: &DocumentId,
        author_id: &DocumentId,
    ) -> Result<Post, PostServiceError> {
        let author = self
            .author_repo
            .get_by_id(author_id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| PostServiceError::AuthorNotFound(author_id.to_string()))?;

        let mut post = self.get(post_id).await?;
        post.author_id = Some(author.id);
        post.updated_at = Utc::now();

        let saved = self.post_repo.update(&post).await.context("Failed to update post")?;
        if !saved {
            return Err(PostServiceError::PostNotFound(post_id.to_string()));
        }
        Ok(post)
    }

    /// Resolve a post's author reference: authors first, then users.
    /// A dangling reference leaves `author` empty.
    pub async fn populate(&self, post: Post) -> Result<PopulatedPost, PostServiceError> {
        let author = match post.author_id {
            Some(author_id) => self.resolve_author(&author_id).await?,
            None => None,
        };
        Ok(PopulatedPost { post, author })
    }

    async fn resolve_author(
        &self,
        id: &DocumentId,
    ) -> Result<Option<AuthorDocument>, PostServiceError> {
        if let Some(author) = self
            .author_repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
        {
            return Ok(Some(AuthorDocument::Author(author)));
        }

        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?;
        Ok(user.map(AuthorDocument::User))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxAuthorRepository, SqlxPostRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Author, User};
    use async_trait::async_trait;

    struct Fixture {
        service: PostService,
        authors: Arc<dyn AuthorRepository>,
        users: Arc<dyn UserRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let authors = SqlxAuthorRepository::boxed(pool.clone());
        let users = SqlxUserRepository::boxed(pool.clone());
        let service = PostService::new(
            SqlxPostRepository::boxed(pool),
            authors.clone(),
            users.clone(),
        );
        Fixture {
            service,
            authors,
            users,
        }
    }

    async fn create_user(fx: &Fixture, email: &str) -> User {
        fx.users
            .create(&User::new(email.to_string(), "hash".to_string()))
            .await
            .unwrap()
    }

    fn post_input(author_id: Option<DocumentId>, text: &str) -> CreatePostInput {
        CreatePostInput {
            author_id,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_populates_user_author() {
        let fx = setup().await;
        let user = create_user(&fx, "a@example.com").await;

        let created = fx.service.create(post_input(Some(user.id), "hi")).await.unwrap();

        assert_eq!(created.post.author_id, Some(user.id));
        assert!(matches!(created.author, Some(AuthorDocument::User(ref u)) if u.id == user.id));
    }

    #[tokio::test]
    async fn test_populate_prefers_authors_and_tolerates_dangling() {
        let fx = setup().await;
        let author = fx.authors.create(&Author::new("Ada".to_string())).await.unwrap();

        let by_author = fx.service.create(post_input(Some(author.id), "a")).await.unwrap();
        let dangling = fx
            .service
            .create(post_input(Some(DocumentId::new()), "b"))
            .await
            .unwrap();
        let anonymous = fx.service.create(post_input(None, "c")).await.unwrap();

        assert!(matches!(by_author.author, Some(AuthorDocument::Author(ref a)) if a.name == "Ada"));
        assert!(dangling.author.is_none());
        assert!(dangling.post.author_id.is_some());
        assert!(anonymous.author.is_none());
    }

    #[tokio::test]
    async fn test_list_with_and_without_population() {
        let fx = setup().await;
        let user = create_user(&fx, "a@example.com").await;
        fx.service.create(post_input(Some(user.id), "one")).await.unwrap();
        fx.service.create(post_input(None, "two")).await.unwrap();

        let populated = fx.service.list(true).await.unwrap();
        assert_eq!(populated.len(), 2);
        assert_eq!(populated[0].post.text, "one");
        assert!(populated[0].author.is_some());

        let bare = fx.service.list(false).await.unwrap();
        assert!(bare.iter().all(|p| p.author.is_none()));
        assert_eq!(bare[0].post.author_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_only_owner_updates() {
        let fx = setup().await;
        let owner = create_user(&fx, "owner@example.com").await;
        let other = create_user(&fx, "other@example.com").await;
        let post = fx.service.create(post_input(Some(owner.id), "v1")).await.unwrap().post;

        let update = UpdatePostInput {
            text: Some("v2".to_string()),
        };
        let refused = fx.service.update(&post.id, update.clone(), Some(&other.id)).await;
        assert!(matches!(refused, Err(PostServiceError::Forbidden)));
        let anonymous = fx.service.update(&post.id, update.clone(), None).await;
        assert!(matches!(anonymous, Err(PostServiceError::Forbidden)));

        let saved = fx.service.update(&post.id, update, Some(&owner.id)).await.unwrap();
        assert_eq!(saved.post.text, "v2");
        assert!(matches!(saved.author, Some(AuthorDocument::User(ref u)) if u.id == owner.id));
        assert_eq!(fx.service.get(&post.id).await.unwrap().text, "v2");
    }

    #[tokio::test]
    async fn test_authorless_post_cannot_be_deleted() {
        let fx = setup().await;
        let user = create_user(&fx, "a@example.com").await;
        let post = fx.service.create(post_input(None, "orphan")).await.unwrap().post;

        let result = fx.service.delete(&post.id, Some(&user.id)).await;
        assert!(matches!(result, Err(PostServiceError::Forbidden)));
        assert!(fx.service.get(&post.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_owner_deletes_post() {
        let fx = setup().await;
        let owner = create_user(&fx, "owner@example.com").await;
        let post = fx.service.create(post_input(Some(owner.id), "bye")).await.unwrap().post;
        fx.service.add_comment(&post.id, "c".to_string()).await.unwrap();

        fx.service.delete(&post.id, Some(&owner.id)).await.unwrap();

        let result = fx.service.get(&post.id).await;
        assert!(matches!(result, Err(PostServiceError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_comments_append_in_order() {
        let fx = setup().await;
        let post = fx.service.create(post_input(None, "p")).await.unwrap().post;

        for text in ["first", "second", "third"] {
            let comment = fx.service.add_comment(&post.id, text.to_string()).await.unwrap();
            assert_eq!(comment.text, text);
        }

        let comments = fx.service.list_comments(&post.id).await.unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_is_not_found() {
        let fx = setup().await;
        let result = fx.service.add_comment(&DocumentId::new(), "x".to_string()).await;
        assert!(matches!(result, Err(PostServiceError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_assign_author() {
        let fx = setup().await;
        let author = fx.authors.create(&Author::new("Ada".to_string())).await.unwrap();
        let post = fx.service.create(post_input(None, "p")).await.unwrap().post;

        let saved = fx.service.assign_author(&post.id, &author.id).await.unwrap();
        assert_eq!(saved.author_id, Some(author.id));
        assert_eq!(fx.service.get(&post.id).await.unwrap().author_id, Some(author.id));

        let missing_post = fx.service.assign_author(&DocumentId::new(), &author.id).await;
        assert!(matches!(missing_post, Err(PostServiceError::PostNotFound(_))));

        let missing_author = fx.service.assign_author(&post.id, &DocumentId::new()).await;
        assert!(matches!(missing_author, Err(PostServiceError::AuthorNotFound(_))));
    }

    /// Post repository whose writes find the post already deleted
    struct DeletedBeforeSave(Arc<dyn PostRepository>);

    #[async_trait]
    impl PostRepository for DeletedBeforeSave {
        async fn list(&self) -> anyhow::Result<Vec<Post>> {
            self.0.list().await
        }

        async fn get_by_id(&self, id: &DocumentId) -> anyhow::Result<Option<Post>> {
            self.0.get_by_id(id).await
        }

        async fn create(&self, post: &Post) -> anyhow::Result<Post> {
            self.0.create(post).await
        }

        async fn update(&self, _post: &Post) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn delete(&self, id: &DocumentId) -> anyhow::Result<bool> {
            self.0.delete(id).await
        }

        async fn append_comment(&self, post_id: &DocumentId, comment: &Comment) -> anyhow::Result<()> {
            self.0.append_comment(post_id, comment).await
        }
    }

    #[tokio::test]
    async fn test_writes_to_vanished_post_are_not_found() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let authors = SqlxAuthorRepository::boxed(pool.clone());
        let users = SqlxUserRepository::boxed(pool.clone());
        let owner = users
            .create(&User::new("a@example.com".to_string(), "hash".to_string()))
            .await
            .unwrap();
        let author = authors.create(&Author::new("Ada".to_string())).await.unwrap();
        let service = PostService::new(
            Arc::new(DeletedBeforeSave(SqlxPostRepository::boxed(pool))),
            authors,
            users,
        );
        let post = service.create(post_input(Some(owner.id), "p")).await.unwrap().post;

        let assigned = service.assign_author(&post.id, &author.id).await;
        assert!(matches!(assigned, Err(PostServiceError::PostNotFound(_))));

        let update = UpdatePostInput {
            text: Some("v2".to_string()),
        };
        let updated = service.update(&post.id, update, Some(&owner.id)).await;
        assert!(matches!(updated, Err(PostServiceError::PostNotFound(_))));
    }
}
