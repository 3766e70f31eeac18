//! Post repository
//!
//! Posts live in `posts`; their embedded comments live in `comments` keyed by
//! `post_id` and are reassembled on read, ordered by insertion (`seq`).

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, DocumentId, Post};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use super::{parse_id, parse_optional_id};

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// List all posts in insertion order, comments included
    async fn list(&self) -> Result<Vec<Post>>;

    /// Get post by ID, comments included
    async fn get_by_id(&self, id: &DocumentId) -> Result<Option<Post>>;

    /// Insert a new post (its comments, if any, are ignored)
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Persist text, author and `updated_at`. Returns false if the post is gone.
    async fn update(&self, post: &Post) -> Result<bool>;

    /// Delete a post and its comments atomically. Returns false if nothing was deleted.
    async fn delete(&self, id: &DocumentId) -> Result<bool>;

    /// Append a comment to a post
    async fn append_comment(&self, post_id: &DocumentId, comment: &Comment) -> Result<()>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn list(&self) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.mysql()?).await,
        }
    }

    async fn get_by_id(&self, id: &DocumentId) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_post_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(INSERT_POST)
                    .bind(post.id.as_string())
                    .bind(post.author_id.map(|id| id.as_string()))
                    .bind(&post.text)
                    .bind(post.created_at)
                    .bind(post.updated_at)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to create post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(INSERT_POST)
                    .bind(post.id.as_string())
                    .bind(post.author_id.map(|id| id.as_string()))
                    .bind(&post.text)
                    .bind(post.created_at)
                    .bind(post.updated_at)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to create post")?;
            }
        }

        Ok(Post {
            comments: Vec::new(),
            ..post.clone()
        })
    }

    async fn update(&self, post: &Post) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(UPDATE_POST)
                .bind(post.author_id.map(|id| id.as_string()))
                .bind(&post.text)
                .bind(post.updated_at)
                .bind(post.id.as_string())
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(UPDATE_POST)
                .bind(post.author_id.map(|id| id.as_string()))
                .bind(&post.text)
                .bind(post.updated_at)
                .bind(post.id.as_string())
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: &DocumentId) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn append_comment(&self, post_id: &DocumentId, comment: &Comment) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(INSERT_COMMENT)
                    .bind(comment.id.as_string())
                    .bind(post_id.as_string())
                    .bind(&comment.text)
                    .bind(comment.created_at)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to add comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(INSERT_COMMENT)
                    .bind(comment.id.as_string())
                    .bind(post_id.as_string())
                    .bind(&comment.text)
                    .bind(comment.created_at)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to add comment")?;
            }
        }
        Ok(())
    }
}

const POST_COLUMNS: &str = "id, author_id, text, created_at, updated_at";

const INSERT_POST: &str = r#"
    INSERT INTO posts (id, author_id, text, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?)
"#;

const UPDATE_POST: &str = r#"
    UPDATE posts
    SET author_id = ?, text = ?, updated_at = ?
    WHERE id = ?
"#;

const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (id, post_id, text, created_at)
    VALUES (?, ?, ?, ?)
"#;

const SELECT_ALL_COMMENTS: &str = r#"
    SELECT id, post_id, text, created_at
    FROM comments
    ORDER BY seq ASC
"#;

const SELECT_POST_COMMENTS: &str = r#"
    SELECT id, post_id, text, created_at
    FROM comments
    WHERE post_id = ?
    ORDER BY seq ASC
"#;

const DELETE_POST_COMMENTS: &str = "DELETE FROM comments WHERE post_id = ?";

const DELETE_POST: &str = "DELETE FROM posts WHERE id = ?";

/// Attach comments (already in insertion order) to their posts
fn attach_comments(posts: &mut [Post], comments: Vec<(DocumentId, Comment)>) {
    let mut by_post: HashMap<DocumentId, Vec<Comment>> = HashMap::new();
    for (post_id, comment) in comments {
        by_post.entry(post_id).or_default().push(comment);
    }
    for post in posts.iter_mut() {
        if let Some(comments) = by_post.remove(&post.id) {
            post.comments = comments;
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_posts_sqlite(pool: &SqlitePool) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!("SELECT {} FROM posts ORDER BY seq ASC", POST_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;
    let mut posts = rows
        .iter()
        .map(row_to_post_sqlite)
        .collect::<Result<Vec<_>>>()?;

    let comment_rows = sqlx::query(SELECT_ALL_COMMENTS)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;
    let comments = comment_rows
        .iter()
        .map(row_to_comment_sqlite)
        .collect::<Result<Vec<_>>>()?;

    attach_comments(&mut posts, comments);
    Ok(posts)
}

async fn get_post_sqlite(pool: &SqlitePool, id: &DocumentId) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id.as_string())
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    let mut post = match row {
        Some(row) => row_to_post_sqlite(&row)?,
        None => return Ok(None),
    };

    let comment_rows = sqlx::query(SELECT_POST_COMMENTS)
        .bind(id.as_string())
        .fetch_all(pool)
        .await
        .context("Failed to get post comments")?;
    post.comments = comment_rows
        .iter()
        .map(|row| row_to_comment_sqlite(row).map(|(_, comment)| comment))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(post))
}

async fn delete_post_sqlite(pool: &SqlitePool, id: &DocumentId) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(DELETE_POST_COMMENTS)
        .bind(id.as_string())
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?;
    let affected = sqlx::query(DELETE_POST)
        .bind(id.as_string())
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?
        .rows_affected();

    tx.commit().await.context("Failed to commit post deletion")?;
    Ok(affected > 0)
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let id: String = row.get("id");
    Ok(Post {
        id: parse_id(&id)?,
        author_id: parse_optional_id(row.get("author_id"))?,
        text: row.get("text"),
        comments: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<(DocumentId, Comment)> {
    let id: String = row.get("id");
    let post_id: String = row.get("post_id");
    Ok((
        parse_id(&post_id)?,
        Comment {
            id: parse_id(&id)?,
            text: row.get("text"),
            created_at: row.get("created_at"),
        },
    ))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_posts_mysql(pool: &MySqlPool) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!("SELECT {} FROM posts ORDER BY seq ASC", POST_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;
    let mut posts = rows
        .iter()
        .map(row_to_post_mysql)
        .collect::<Result<Vec<_>>>()?;

    let comment_rows = sqlx::query(SELECT_ALL_COMMENTS)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;
    let comments = comment_rows
        .iter()
        .map(row_to_comment_mysql)
        .collect::<Result<Vec<_>>>()?;

    attach_comments(&mut posts, comments);
    Ok(posts)
}

async fn get_post_mysql(pool: &MySqlPool, id: &DocumentId) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id.as_string())
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    let mut post = match row {
        Some(row) => row_to_post_mysql(&row)?,
        None => return Ok(None),
    };

    let comment_rows = sqlx::query(SELECT_POST_COMMENTS)
        .bind(id.as_string())
        .fetch_all(pool)
        .await
        .context("Failed to get post comments")?;
    post.comments = comment_rows
        .iter()
        .map(|row| row_to_comment_mysql(row).map(|(_, comment)| comment))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(post))
}

async fn delete_post_mysql(pool: &MySqlPool, id: &DocumentId) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(DELETE_POST_COMMENTS)
        .bind(id.as_string())
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?;
    let affected = sqlx::query(DELETE_POST)
        .bind(id.as_string())
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?
        .rows_affected();

    tx.commit().await.context("Failed to commit post deletion")?;
    Ok(affected > 0)
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let id: String = row.get("id");
    Ok(Post {
        id: parse_id(&id)?,
        author_id: parse_optional_id(row.get("author_id"))?,
        text: row.get("text"),
        comments: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<(DocumentId, Comment)> {
    let id: String = row.get("id");
    let post_id: String = row.get("post_id");
    Ok((
        parse_id(&post_id)?,
        Comment {
            id: parse_id(&id)?,
            text: row.get("text"),
            created_at: row.get("created_at"),
        },
    ))
}
