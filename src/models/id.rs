//! Document identifiers
//!
//! Every stored document is keyed by a `DocumentId`: a UUID kept in its
//! canonical lowercase, hyphenated text form. Ids coming from URLs, cookies
//! or database rows all pass through `DocumentId::parse`, so two ids naming
//! the same document always compare equal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical identifier of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from any accepted UUID spelling.
    ///
    /// Returns `None` for anything that is not a UUID.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }

    /// Canonical text form, as stored in the database
    pub fn as_string(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DocumentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| anyhow::anyhow!("Invalid document id: {}", s))
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonicalizes_case_and_whitespace() {
        let lower = DocumentId::parse("6f9619ff-8b86-d011-b42d-00cf4fc964ff").unwrap();
        let upper = DocumentId::parse(" 6F9619FF-8B86-D011-B42D-00CF4FC964FF ").unwrap();
        let simple = DocumentId::parse("6f9619ff8b86d011b42d00cf4fc964ff").unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower, simple);
        assert_eq!(upper.to_string(), "6f9619ff-8b86-d011-b42d-00cf4fc964ff");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(DocumentId::parse("").is_none());
        assert!(DocumentId::parse("507f1f77bcf86cd799439011").is_none());
        assert!("not-an-id".parse::<DocumentId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = DocumentId::parse("6f9619ff-8b86-d011-b42d-00cf4fc964ff").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"6f9619ff-8b86-d011-b42d-00cf4fc964ff\"");

        let back: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
