//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{DateSelector, FieldSelector, SourceConfig};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and scheduling settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Where indexes, metadata and records live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log level defaults
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Blog sources to harvest
    #[serde(default = "defaults::default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, falling back to defaults only when the file does
    /// not exist. A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(AppError::validation("storage.data_dir is empty"));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            validate_source(source)?;
            if !names.insert(source.name.as_str()) {
                return Err(AppError::validation(format!(
                    "source {} is defined more than once",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            sources: defaults::default_sources(),
        }
    }
}

fn validate_source(source: &SourceConfig) -> Result<()> {
    if !is_safe_file_stem(&source.name) {
        return Err(AppError::validation(format!(
            "source name {:?} cannot be used as a file name",
            source.name
        )));
    }
    if source.display_name.trim().is_empty() {
        return Err(AppError::validation(format!(
            "source {} has an empty display_name",
            source.name
        )));
    }

    let home = url::Url::parse(&source.home_page)?;
    if !matches!(home.scheme(), "http" | "https") || home.host_str().is_none() {
        return Err(AppError::validation(format!(
            "source {} home_page must be an http(s) URL",
            source.name
        )));
    }

    if source.pages.is_empty() {
        return Err(AppError::validation(format!(
            "source {} has no listing pages",
            source.name
        )));
    }
    for page in &source.pages {
        url::Url::parse(page)?;
    }

    for selector in source.selectors() {
        scraper::Selector::parse(selector)
            .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
    }
    Ok(())
}

/// Source names become file stems under the data directory.
fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// HTTP client and scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum sources harvested at once (0 = all at once)
    #[serde(default)]
    pub max_concurrent_sources: usize,

    /// Cancel the whole run after this many seconds (0 = no deadline)
    #[serde(default)]
    pub run_deadline_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent_sources: 0,
            run_deadline_secs: 0,
        }
    }
}

/// Storage location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for `<source>.txt`, `<source>.meta.json` and `<source>.d/`
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{DateSelector, FieldSelector, SourceConfig};

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; insight-hub/1.0)".into()
    }
    pub fn timeout() -> u64 {
        10
    }

    // Storage defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }

    // Source defaults
    pub fn default_sources() -> Vec<SourceConfig> {
        vec![SourceConfig {
            name: "antonz.org".to_string(),
            display_name: "Anton Zhiyanov".to_string(),
            home_page: "https://antonz.org/".to_string(),
            pages: vec!["https://antonz.org/all/".to_string()],
            links: FieldSelector::attr("div.posts div.post-stub a.post-stub__title", "href"),
            href_prefix: Some("https://antonz.org".to_string()),
            title: FieldSelector::attr(r#"meta[property="og:title"]"#, "content"),
            author: FieldSelector::attr(r#"meta[name="author"]"#, "content"),
            content: FieldSelector::text("article.post"),
            published_at: Some(DateSelector {
                selector: "footer.post__footer div.row div.post__date time".to_string(),
                attr: Some("datetime".to_string()),
                formats: vec!["%Y-%m-%d %H:%M:%S %z".to_string()],
                required: false,
            }),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.crawler.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsafe_source_name() {
        let mut config = Config::default();
        config.sources[0].name = "../etc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_sources() {
        let mut config = Config::default();
        let dup = config.sources[0].clone();
        config.sources.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.sources[0].title.selector = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn validate_rejects_non_http_home_page() {
        let mut config = Config::default();
        config.sources[0].home_page = "ftp://antonz.org/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[crawler]\ntimeout_secs = 3\n").unwrap();
        assert_eq!(config.crawler.timeout_secs, 3);
        assert_eq!(config.crawler.user_agent, defaults::user_agent());
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.sources.len(), 1);
        assert!(config.source("antonz.org").is_some());
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let config = Config::load_or_default("/nonexistent/insight-hub.toml").unwrap();
        assert_eq!(config.crawler.timeout_secs, 10);
    }

    #[test]
    fn load_or_default_rejects_unparsable_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("insight-hub.toml");
        fs::write(&path, "[crawler\ntimeout_secs = 3\n").unwrap();

        assert!(matches!(Config::load_or_default(&path), Err(AppError::Toml(_))));
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn load_or_default_reads_existing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("insight-hub.toml");
        fs::write(&path, "[storage]\ndata_dir = \"out\"\n").unwrap();

        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("out"));
    }

    #[test]
    fn safe_file_stems() {
        assert!(is_safe_file_stem("antonz.org"));
        assert!(is_safe_file_stem("go_dev-blog"));
        assert!(!is_safe_file_stem(""));
        assert!(!is_safe_file_stem(".hidden"));
        assert!(!is_safe_file_stem("a/b"));
        assert!(!is_safe_file_stem("a b"));
    }
}
