//! User repository
//!
//! Database operations for user accounts. Email uniqueness is enforced by
//! the `users.email` unique index.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{DocumentId, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::parse_id;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: &DocumentId) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, id: &DocumentId) -> Result<Option<User>> {
        let id = id.as_string();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_sqlite(self.pool.sqlite()?, SELECT_BY_ID, &id).await
            }
            DatabaseDriver::Mysql => get_user_mysql(self.pool.mysql()?, SELECT_BY_ID, &id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_sqlite(self.pool.sqlite()?, SELECT_BY_EMAIL, email).await
            }
            DatabaseDriver::Mysql => {
                get_user_mysql(self.pool.mysql()?, SELECT_BY_EMAIL, email).await
            }
        }
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (id, email, password_hash, created_at)
    VALUES (?, ?, ?, ?)
"#;

const SELECT_BY_ID: &str = r#"
    SELECT id, email, password_hash, created_at
    FROM users
    WHERE id = ?
"#;

const SELECT_BY_EMAIL: &str = r#"
    SELECT id, email, password_hash, created_at
    FROM users
    WHERE email = ?
"#;


// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(INSERT_USER)
        .bind(user.id.as_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(user.clone())
}

async fn get_user_sqlite(pool: &SqlitePool, sql: &str, key: &str) -> Result<Option<User>> {
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    Ok(User {
        id: parse_id(&id)?,
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    sqlx::query(INSERT_USER)
        .bind(user.id.as_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(user.clone())
}

async fn get_user_mysql(pool: &MySqlPool, sql: &str, key: &str) -> Result<Option<User>> {
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let id: String = row.get("id");
    Ok(User {
        id: parse_id(&id)?,
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;
        let user = User::new("a@example.com".to_string(), "hash".to_string());

        repo.create(&user).await.expect("Failed to create user");

        let by_id = repo.get_by_id(&user.id).await.unwrap().expect("User not found");
        assert_eq!(by_id.id, user.id);
        assert_eq!(by_id.email, "a@example.com");
        assert_eq!(by_id.password_hash, "hash");

        let by_email = repo.get_by_email("a@example.com").await.unwrap().expect("User not found");
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let repo = setup_test_repo().await;

        assert!(repo.get_by_id(&DocumentId::new()).await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup_test_repo().await;

        repo.create(&User::new("same@example.com".to_string(), "h1".to_string()))
            .await
            .unwrap();
        let result = repo
            .create(&User::new("same@example.com".to_string(), "h2".to_string()))
            .await;

        assert!(result.is_err());
        let kept = repo.get_by_email("same@example.com").await.unwrap().unwrap();
        assert_eq!(kept.password_hash, "h1");
    }
}
