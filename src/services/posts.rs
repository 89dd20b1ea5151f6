// src/services/posts.rs

//! Selector-driven blog adapter.
//!
//! Fetches listing pages and posts over HTTP and extracts links and post
//! fields using the CSS selectors configured for the source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{FieldSelector, Record, SourceConfig};
use crate::services::{SourceAdapter, parse_published_at};
use crate::utils::http::fetch_text_async;
use crate::utils::resolve;

/// A configured field selector, parsed once.
#[derive(Debug)]
struct CompiledField {
    selector: Selector,
    attr: Option<String>,
}

impl CompiledField {
    fn compile(field: &FieldSelector) -> Result<Self> {
        Ok(Self {
            selector: parse_selector(&field.selector)?,
            attr: field.attr.clone(),
        })
    }

    /// Trimmed attribute value or text of `element`.
    fn value_of(&self, element: ElementRef<'_>) -> String {
        match &self.attr {
            Some(attr) => element.value().attr(attr).unwrap_or("").trim().to_string(),
            None => element.text().collect::<String>().trim().to_string(),
        }
    }

    /// Value of the first match in `document`, if any.
    fn first_value(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selector)
            .next()
            .map(|element| self.value_of(element))
    }
}

/// Adapter for a source described by a [`SourceConfig`].
#[derive(Debug)]
pub struct SelectorAdapter {
    config: SourceConfig,
    client: Client,
    links: CompiledField,
    title: CompiledField,
    author: CompiledField,
    content: Selector,
    published_at: Option<CompiledField>,
}

impl SelectorAdapter {
    /// Compile the source's selectors; fails on the first invalid one.
    pub fn new(config: SourceConfig, client: Client) -> Result<Self> {
        let links = CompiledField::compile(&config.links)?;
        let title = CompiledField::compile(&config.title)?;
        let author = CompiledField::compile(&config.author)?;
        let content = parse_selector(&config.content.selector)?;
        let published_at = match &config.published_at {
            Some(date) => Some(CompiledField {
                selector: parse_selector(&date.selector)?,
                attr: date.attr.clone(),
            }),
            None => {
                log::warn!(
                    "[{}] no published_at selector; posts will be dated by fetch time",
                    config.name
                );
                None
            }
        };

        Ok(Self {
            config,
            client,
            links,
            title,
            author,
            content,
            published_at,
        })
    }

    /// Extract candidate links from a listing page's HTML.
    pub fn extract_links(&self, page_url: &str, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.links.selector)
            .map(|element| self.links.value_of(element))
            .filter(|href| !href.is_empty())
            .filter_map(|href| self.absolutize(page_url, &href))
            .collect()
    }

    fn absolutize(&self, page_url: &str, href: &str) -> Option<String> {
        if url::Url::parse(href).is_ok() {
            return Some(href.to_string());
        }
        match &self.config.href_prefix {
            Some(prefix) => Some(format!("{prefix}{href}")),
            None => resolve(page_url, href),
        }
    }

    /// Extract a record from a post's HTML.
    ///
    /// `fetched_at` stands in for the publication date when none can be
    /// parsed, unless the source requires one.
    pub fn extract_record(
        &self,
        link: &str,
        html: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Record> {
        let document = Html::parse_document(html);

        let title = required_value(&document, &self.title, link, "title")?;
        let author = required_value(&document, &self.author, link, "author")?;
        let content = document
            .select(&self.content)
            .next()
            .map(|element| element.html())
            .ok_or_else(|| AppError::fetch(link, "content not found"))?;
        let published_at = self.published_at(&document, link, fetched_at)?;

        Ok(Record {
            id: None,
            source: self.config.name.clone(),
            link: link.to_string(),
            title,
            author,
            content,
            published_at,
        })
    }

    fn published_at(
        &self,
        document: &Html,
        link: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let (Some(field), Some(date)) = (&self.published_at, &self.config.published_at) else {
            return Ok(fetched_at);
        };

        let raw = field.first_value(document);
        if let Some(parsed) = raw
            .as_deref()
            .and_then(|raw| parse_published_at(raw, &date.formats))
        {
            return Ok(parsed);
        }

        let problem = match raw {
            Some(raw) => format!("unparsable publish date {raw:?}"),
            None => "publish date not found".to_string(),
        };
        if date.required {
            return Err(AppError::fetch(link, problem));
        }
        log::warn!(
            "[{}] {} for {}; using fetch time",
            self.config.name,
            problem,
            link
        );
        Ok(fetched_at)
    }
}

#[async_trait]
impl SourceAdapter for SelectorAdapter {
    fn source_name(&self) -> &str {
        &self.config.name
    }

    fn display_name(&self) -> &str {
        &self.config.display_name
    }

    fn home_page(&self) -> &str {
        &self.config.home_page
    }

    fn page_urls(&self) -> Vec<String> {
        self.config.pages.clone()
    }

    async fn links_from_page(&self, page_url: &str) -> Result<Vec<String>> {
        let html = fetch_text_async(&self.client, page_url).await?;
        Ok(self.extract_links(page_url, &html))
    }

    async fn fetch_record(&self, link: &str) -> Result<Record> {
        let html = fetch_text_async(&self.client, link).await?;
        self.extract_record(link, &html, Utc::now())
    }
}

fn required_value(
    document: &Html,
    field: &CompiledField,
    link: &str,
    name: &str,
) -> Result<String> {
    match field.first_value(document) {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(AppError::fetch(link, format!("{name} is empty"))),
        None => Err(AppError::fetch(link, format!("{name} not found"))),
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{Config, DateSelector};

    const LISTING: &str = r#"
        <html><body>
          <div class="posts">
            <div class="post-stub"><a class="post-stub__title" href="/go-1-22/">Go 1.22</a></div>
            <div class="post-stub"><a class="post-stub__title" href=" /sqlite-3-45/ ">SQLite</a></div>
            <div class="post-stub"><a class="post-stub__title" href="">Empty</a></div>
            <div class="post-stub"><a class="post-stub__title" href="https://antonz.org/abs/">Abs</a></div>
          </div>
          <a class="post-stub__title" href="/outside/">Not in the list</a>
        </body></html>
    "#;

    const POST: &str = r#"
        <html><head>
          <meta property="og:title" content=" Go 1.22 interactive tour ">
          <meta name="author" content="Anton Zhiyanov">
        </head><body>
          <article class="post"><p>hi</p></article>
          <footer class="post__footer"><div class="row">
            <div class="post__date"><time datetime="2024-02-05 10:00:00 +0000 UTC">Feb 5</time></div>
          </div></footer>
        </body></html>
    "#;

    fn antonz() -> SelectorAdapter {
        let source = Config::default().sources.remove(0);
        SelectorAdapter::new(source, Client::new()).unwrap()
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let mut source = Config::default().sources.remove(0);
        source.links.selector = "[[invalid".to_string();
        assert!(SelectorAdapter::new(source, Client::new()).is_err());
    }

    #[test]
    fn test_extract_links_in_page_order() {
        let links = antonz().extract_links("https://antonz.org/all/", LISTING);
        assert_eq!(
            links,
            vec![
                "https://antonz.org/go-1-22/",
                "https://antonz.org/sqlite-3-45/",
                "https://antonz.org/abs/",
            ]
        );
    }

    #[test]
    fn test_extract_links_resolves_without_prefix() {
        let mut source = Config::default().sources.remove(0);
        source.href_prefix = None;
        let adapter = SelectorAdapter::new(source, Client::new()).unwrap();

        let links = adapter.extract_links("https://antonz.org/all/", LISTING);
        assert_eq!(links[0], "https://antonz.org/go-1-22/");
    }

    #[test]
    fn test_extract_record() {
        let link = "https://antonz.org/go-1-22/";
        let record = antonz().extract_record(link, POST, fetched_at()).unwrap();

        assert_eq!(record.id, None);
        assert_eq!(record.source, "antonz.org");
        assert_eq!(record.link, link);
        assert_eq!(record.title, "Go 1.22 interactive tour");
        assert_eq!(record.author, "Anton Zhiyanov");
        assert_eq!(record.content, r#"<article class="post"><p>hi</p></article>"#);
        assert_eq!(
            record.published_at,
            Utc.with_ymd_and_hms(2024, 2, 5, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_title_is_a_fetch_error() {
        let html = POST.replace("og:title", "og:description");
        let result = antonz().extract_record("https://antonz.org/x/", &html, fetched_at());
        assert!(matches!(result, Err(AppError::Fetch { .. })));
    }

    #[test]
    fn test_empty_author_is_a_fetch_error() {
        let html = POST.replace("Anton Zhiyanov", "  ");
        let result = antonz().extract_record("https://antonz.org/x/", &html, fetched_at());
        assert!(matches!(result, Err(AppError::Fetch { .. })));
    }

    #[test]
    fn test_missing_date_falls_back_to_fetch_time() {
        let html = POST.replace("post__date", "post__updated");
        let record = antonz()
            .extract_record("https://antonz.org/x/", &html, fetched_at())
            .unwrap();
        assert_eq!(record.published_at, fetched_at());
    }

    #[test]
    fn test_required_date_rejects_post() {
        let mut source = Config::default().sources.remove(0);
        source.published_at = Some(DateSelector {
            selector: "time.published".to_string(),
            attr: None,
            formats: vec![],
            required: true,
        });
        let adapter = SelectorAdapter::new(source, Client::new()).unwrap();

        let result = adapter.extract_record("https://antonz.org/x/", POST, fetched_at());
        assert!(matches!(result, Err(AppError::Fetch { .. })));
    }

    #[test]
    fn test_meta_from_config() {
        let meta = antonz().meta();
        assert_eq!(meta.source, "antonz.org");
        assert_eq!(meta.home_page, "https://antonz.org/");
        assert_eq!(meta.name, "Anton Zhiyanov");
    }
}
