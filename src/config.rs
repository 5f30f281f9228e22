use crate::targets::Enumeration;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QuotaScope {
    /// The quota applies to every (category, city) pair.
    PerTarget,
    /// The quota applies to the category as a whole, across cities.
    PerCategory,
}

#[derive(Debug, Clone)]
pub struct Timing {
    /// Upper bound for the search results UI to resolve.
    pub search_timeout: Duration,
    /// Upper bound for a listing's detail panel to open after a click.
    pub detail_timeout: Duration,
    /// Pause after each scroll before re-counting listings.
    pub settle_delay: Duration,
    /// Pause between attempts to open a listing.
    pub retry_backoff: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            search_timeout: Duration::from_secs(15),
            detail_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl Timing {
    /// No waiting at all; for scripted browsers.
    pub fn immediate() -> Self {
        Self {
            search_timeout: Duration::ZERO,
            detail_timeout: Duration::ZERO,
            settle_delay: Duration::ZERO,
            retry_backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapingOptions {
    pub output_file: PathBuf,
    pub cities_file: PathBuf,
    pub quota: usize,
    pub quota_scope: QuotaScope,
    pub enumeration: Enumeration,
    pub seed: Option<u64>,
    pub flush_batch_size: usize,
    pub max_stall_scrolls: usize,
    pub max_open_attempts: usize,
    pub timing: Timing,
    pub webdriver_url: String,
    pub headless: bool,
}

impl Default for ScrapingOptions {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("scraped_results.csv"),
            cities_file: PathBuf::from("uscities.csv"),
            quota: 20,
            quota_scope: QuotaScope::PerTarget,
            enumeration: Enumeration::Ordered,
            seed: None,
            flush_batch_size: 10,
            max_stall_scrolls: 10,
            max_open_attempts: 5,
            timing: Timing::default(),
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
        }
    }
}
