// src/store/identity.rs

//! Content-addressed record identifiers.

use sha2::{Digest, Sha256};

use crate::models::{Record, RecordId};

/// Prefix mixed into every digest so ids cannot collide with other SHA-256 uses.
const DOMAIN_TAG: &[u8] = b"insight-hub/record/v1\0";

/// Compute the identifier of a record from its stable fields.
///
/// Only `source`, `link`, `title`, `author` and `content` are hashed.
/// `published_at` may be a fetch-time fallback and `id` is the output, so both
/// are excluded. Each field is length-prefixed, which keeps field boundaries
/// unambiguous (`("ab", "c")` and `("a", "bc")` hash differently).
pub fn identify(record: &Record) -> RecordId {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_TAG);
    for field in [
        &record.source,
        &record.link,
        &record.title,
        &record.author,
        &record.content,
    ] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    RecordId::from_digest(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample_record() -> Record {
        Record {
            id: None,
            source: "antonz.org".to_string(),
            link: "https://antonz.org/all/post-1".to_string(),
            title: "X".to_string(),
            author: "A".to_string(),
            content: "<p>hi</p>".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_identify_is_deterministic() {
        let record = sample_record();
        assert_eq!(identify(&record), identify(&record.clone()));
    }

    #[test]
    fn test_identify_is_filename_safe_hex() {
        let id = identify(&sample_record());
        assert_eq!(id.as_str().len(), 64);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_identify_ignores_published_at_and_id() {
        let record = sample_record();
        let mut later = record.clone();
        later.published_at = Utc::now();
        later.id = Some(identify(&record));
        assert_eq!(identify(&record), identify(&later));
    }

    #[test]
    fn test_identify_differs_per_stable_field() {
        let base = sample_record();
        let base_id = identify(&base);

        let mutations: Vec<fn(&mut Record)> = vec![
            |r| r.source.push('x'),
            |r| r.link.push('x'),
            |r| r.title.push('x'),
            |r| r.author.push('x'),
            |r| r.content.push('x'),
        ];
        for mutate in mutations {
            let mut changed = base.clone();
            mutate(&mut changed);
            assert_ne!(identify(&changed), base_id);
        }
    }

    #[test]
    fn test_identify_respects_field_boundaries() {
        let mut a = sample_record();
        a.title = "ab".to_string();
        a.author = "c".to_string();
        let mut b = sample_record();
        b.title = "a".to_string();
        b.author = "bc".to_string();
        assert_ne!(identify(&a), identify(&b));
    }
}
