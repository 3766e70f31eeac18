//! Author service

use crate::db::repositories::AuthorRepository;
use crate::models::Author;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Author service
pub struct AuthorService {
    repo: Arc<dyn AuthorRepository>,
}

impl AuthorService {
    pub fn new(repo: Arc<dyn AuthorRepository>) -> Self {
        Self { repo }
    }

    /// All authors in insertion order
    pub async fn list(&self) -> Result<Vec<Author>> {
        self.repo.list().await.context("Failed to list authors")
    }

    pub async fn create(&self, name: String) -> Result<Author> {
        let author = Author::new(name);
        self.repo
            .create(&author)
            .await
            .context("Failed to create author")
    }
}
