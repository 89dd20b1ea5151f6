//! Per-source and whole-run harvest statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of harvesting a single source.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    pub source: String,
    /// Listing pages scanned successfully
    pub pages: usize,
    /// Listing pages that could not be fetched or parsed
    pub page_failures: usize,
    /// Candidate links returned by the listing pages
    pub links_seen: usize,
    /// Links rejected by the tidiness check
    pub untidy: usize,
    /// Links already present in the index
    pub duplicates: usize,
    /// Posts that could not be fetched or extracted
    pub fetch_failures: usize,
    /// Posts rejected by record validation
    pub invalid: usize,
    /// Records persisted and indexed in this run
    pub saved: usize,
    /// Records whose persistence or index append failed
    pub save_failures: usize,
    pub meta_written: bool,
    /// The run stopped early because of a shutdown signal
    pub cancelled: bool,
    /// Fatal error that ended this source's run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// A source failed when it hit a fatal error or no listing page worked.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || (self.pages == 0 && self.page_failures > 0)
    }
}

/// Aggregated outcome of a harvest run.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reports: Vec<SourceReport>,
}

impl HarvestSummary {
    pub fn saved(&self) -> usize {
        self.reports.iter().map(|r| r.saved).sum()
    }

    pub fn failed_sources(&self) -> Vec<&SourceReport> {
        self.reports.iter().filter(|r| r.is_failure()).collect()
    }
}
