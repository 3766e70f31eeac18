//! Author repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Author, DocumentId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

use super::parse_id;

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// List all authors in insertion order
    async fn list(&self) -> Result<Vec<Author>>;

    /// Get author by ID
    async fn get_by_id(&self, id: &DocumentId) -> Result<Option<Author>>;

    /// Insert a new author
    async fn create(&self, author: &Author) -> Result<Author>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_AUTHORS: &str = "SELECT id, name, created_at FROM authors ORDER BY seq ASC";

const SELECT_AUTHOR: &str = "SELECT id, name, created_at FROM authors WHERE id = ?";

const INSERT_AUTHOR: &str = "INSERT INTO authors (id, name, created_at) VALUES (?, ?, ?)";

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn list(&self) -> Result<Vec<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(SELECT_AUTHORS)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list authors")?;
                rows.iter().map(row_to_author_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(SELECT_AUTHORS)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list authors")?;
                rows.iter().map(row_to_author_mysql).collect()
            }
        }
    }

    async fn get_by_id(&self, id: &DocumentId) -> Result<Option<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SELECT_AUTHOR)
                    .bind(id.as_string())
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get author by ID")?;
                row.as_ref().map(row_to_author_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SELECT_AUTHOR)
                    .bind(id.as_string())
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get author by ID")?;
                row.as_ref().map(row_to_author_mysql).transpose()
            }
        }
    }

    async fn create(&self, author: &Author) -> Result<Author> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(INSERT_AUTHOR)
                    .bind(author.id.as_string())
                    .bind(&author.name)
                    .bind(author.created_at)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to create author")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(INSERT_AUTHOR)
                    .bind(author.id.as_string())
                    .bind(&author.name)
                    .bind(author.created_at)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to create author")?;
            }
        }
        Ok(author.clone())
    }
}

fn row_to_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Author> {
    let id: String = row.get("id");
    Ok(Author {
        id: parse_id(&id)?,
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

fn row_to_author_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Author> {
    let id: String = row.get("id");
    Ok(Author {
        id: parse_id(&id)?,
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}
