//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DocumentId;

/// Comment embedded in a post. It has no life outside its post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: String) -> Self {
        Self {
            id: DocumentId::new(),
            text,
            created_at: Utc::now(),
        }
    }
}
