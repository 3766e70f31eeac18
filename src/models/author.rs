//! Author model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DocumentId;

/// A named author that posts can be attributed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Author {
    pub fn new(name: String) -> Self {
        Self {
            id: DocumentId::new(),
            name,
            created_at: Utc::now(),
        }
    }
}
