// src/services/dates.rs

//! Publication date parsing.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

/// Parse a publication date as blogs tend to print it.
///
/// Tries RFC 3339, then each chrono `format` (with and without an offset),
/// then the first `YYYY-MM-DD` / `YYYY/MM/DD` / `YYYY.MM.DD` date found
/// anywhere in the text, taken as midnight UTC.
pub fn parse_published_at(raw: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in formats {
        if let Some(dt) = parse_with_format(text, format) {
            return Some(dt);
        }
        // Trailing zone abbreviations ("+0300 MSK") are not understood by chrono
        if let Some((head, _)) = text.rsplit_once(' ') {
            if let Some(dt) = parse_with_format(head, format) {
                return Some(dt);
            }
        }
    }

    embedded_date(text)
}

fn parse_with_format(text: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn embedded_date(text: &str) -> Option<DateTime<Utc>> {
    static DATE: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = DATE
        .get_or_init(|| Regex::new(r"(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})").ok())
        .as_ref()?;

    let caps = pattern.captures(text)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!(
            parse_published_at("2024-01-01T00:00:00Z", &[]),
            Some(utc(2024, 1, 1, 0, 0, 0))
        );
        assert_eq!(
            parse_published_at(" 2024-01-01T03:00:00+03:00 ", &[]),
            Some(utc(2024, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_format_with_zone_abbreviation() {
        let formats = vec!["%Y-%m-%d %H:%M:%S %z".to_string()];
        assert_eq!(
            parse_published_at("2023-10-05 12:30:00 +0300 MSK", &formats),
            Some(utc(2023, 10, 5, 9, 30, 0))
        );
        assert_eq!(
            parse_published_at("2023-10-05 12:30:00 +0000 +0000", &formats),
            Some(utc(2023, 10, 5, 12, 30, 0))
        );
    }

    #[test]
    fn test_naive_formats() {
        let formats = vec!["%B %d, %Y".to_string(), "%Y-%m-%d %H:%M".to_string()];
        assert_eq!(
            parse_published_at("January 02, 2024", &formats),
            Some(utc(2024, 1, 2, 0, 0, 0))
        );
        assert_eq!(
            parse_published_at("2024-03-04 05:06", &formats),
            Some(utc(2024, 3, 4, 5, 6, 0))
        );
    }

    #[test]
    fn test_embedded_date() {
        assert_eq!(
            parse_published_at("Posted on 2022/7/15 by someone", &[]),
            Some(utc(2022, 7, 15, 0, 0, 0))
        );
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(parse_published_at("", &[]), None);
        assert_eq!(parse_published_at("yesterday", &[]), None);
        assert_eq!(parse_published_at("2022-13-45", &[]), None);
    }
}
