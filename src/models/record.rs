//! Post record and source metadata structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Content-derived record identifier: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One accepted blog post.
///
/// `id` stays `None` until the store accepts the record, at which point it is
/// set to the content-derived identifier and never changes again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Content-derived identifier, also the record's file stem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    /// Source the post came from (e.g., "antonz.org")
    pub source: String,

    /// Canonical URL of the post
    pub link: String,

    /// Post title
    pub title: String,

    /// Post author
    pub author: String,

    /// Raw extracted body markup
    pub content: String,

    /// Publication time (best-effort)
    pub published_at: DateTime<Utc>,
}

impl Record {
    /// Check that the fields every accepted post must carry are present.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation(format!(
                "record {} has an empty title",
                self.link
            )));
        }
        if self.author.trim().is_empty() {
            return Err(AppError::validation(format!(
                "record {} has an empty author",
                self.link
            )));
        }
        Ok(())
    }
}

/// Descriptor of a source, fully rewritten on every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    /// Source identifier (also the file stem)
    pub source: String,

    /// Home page URL
    pub home_page: String,

    /// Display name of the blog or blogger
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record {
            id: None,
            source: "antonz.org".to_string(),
            link: "https://antonz.org/all/post-1".to_string(),
            title: "X".to_string(),
            author: "A".to_string(),
            content: "<p>hi</p>".to_string(),
            published_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let mut record = sample_record();
        record.title = "   ".to_string();
        assert!(matches!(record.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_missing_author() {
        let mut record = sample_record();
        record.author.clear();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_serialized_field_order() {
        let mut record = sample_record();
        record.id = Some(RecordId::from_digest(&[0xab, 0xcd]));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.starts_with(r#"{"id":"abcd","source":"antonz.org""#));
        assert!(json.contains(r#""published_at":"2024-01-01T00:00:00Z""#));
    }

    #[test]
    fn test_unaccepted_record_omits_id() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(!json.contains("\"id\""));
    }
}
