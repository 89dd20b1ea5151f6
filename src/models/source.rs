// src/models/source.rs

//! Declarative description of one blog source.

use serde::{Deserialize, Serialize};

/// How to pull a single value out of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSelector {
    /// CSS selector for the element
    pub selector: String,

    /// Attribute to read; the element's text is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

impl FieldSelector {
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attr: None,
        }
    }

    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attr: Some(attr.into()),
        }
    }
}

/// How to find and parse a post's publication date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateSelector {
    /// CSS selector for the element holding the date
    pub selector: String,

    /// Attribute to read; the element's text is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,

    /// chrono format strings tried in order after RFC 3339
    #[serde(default)]
    pub formats: Vec<String>,

    /// Reject the post instead of falling back to the fetch time
    #[serde(default)]
    pub required: bool,
}

/// A blog source: where to look and how to extract posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Stable source identifier, used as the file stem under the data directory
    pub name: String,

    /// Human-readable blog or blogger name
    pub display_name: String,

    /// Home page URL; accepted links must share its scheme and host
    pub home_page: String,

    /// Listing pages to scan for post links
    pub pages: Vec<String>,

    /// Selector for post links on a listing page
    pub links: FieldSelector,

    /// Prefix prepended to every extracted href (resolved against the page otherwise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href_prefix: Option<String>,

    /// Post title
    pub title: FieldSelector,

    /// Post author
    pub author: FieldSelector,

    /// Post body; the first match's outer HTML is stored
    pub content: FieldSelector,

    /// Publication date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateSelector>,
}

impl SourceConfig {
    /// All CSS selectors this source uses, for up-front validation.
    pub fn selectors(&self) -> Vec<&str> {
        let mut all = vec![
            self.links.selector.as_str(),
            self.title.selector.as_str(),
            self.author.selector.as_str(),
            self.content.selector.as_str(),
        ];
        if let Some(date) = &self.published_at {
            all.push(date.selector.as_str());
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_from_toml() {
        let raw = r#"
            name = "example.com"
            display_name = "Example"
            home_page = "https://example.com/"
            pages = ["https://example.com/blog/"]
            links = { selector = "a.post", attr = "href" }
            title = { selector = "h1" }
            author = { selector = "meta[name=author]", attr = "content" }
            content = { selector = "article" }
            published_at = { selector = "time", attr = "datetime", required = true }
        "#;

        let source: SourceConfig = toml::from_str(raw).unwrap();
        assert_eq!(source.name, "example.com");
        assert_eq!(source.title, FieldSelector::text("h1"));
        assert_eq!(source.links, FieldSelector::attr("a.post", "href"));
        assert!(source.href_prefix.is_none());

        let date = source.published_at.as_ref().unwrap();
        assert!(date.required);
        assert!(date.formats.is_empty());
        assert_eq!(source.selectors().len(), 5);
    }
}
