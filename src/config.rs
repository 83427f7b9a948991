use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_SOURCE: &str = "reddit-historical";
pub const DEFAULT_BASE_URL: &str = "https://api.pushshift.io/reddit";
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 2;
/// Upper bound accepted by the submissions endpoint.
pub const MAX_PAGE_SIZE: u32 = 500;

const DEFAULT_QUERIES: [&str; 3] = ["covid", "coronavirus", "sars-cov-2"];
const DEFAULT_SUBREDDITS: [&str; 13] = [
    "Canada",
    "CanadaPolitics",
    "CanadaCoronavirus",
    "Vancouver",
    "Edmonton",
    "Winnipeg",
    "Montreal",
    "Ottawa",
    "Saskatoon",
    "Calgary",
    "Toronto",
    "Ontario",
    "onguardforthee",
];

/// How accumulated payloads are laid out on disk.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistFormat {
    /// `<stem>.json` holding one JSON array, rewritten on every append.
    #[default]
    JsonArray,
    /// `<stem>.jsonl` holding one compact payload per line.
    JsonLines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryBudget {
    pub submissions: u32,
    pub comment_ids: u32,
    pub comments: u32,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::uniform(1)
    }
}

impl RetryBudget {
    pub fn uniform(retries: u32) -> Self {
        Self {
            submissions: retries,
            comment_ids: retries,
            comments: retries,
        }
    }
}

/// Everything a retrieval run needs. The defaults reproduce the covid
/// collection over Canadian subreddits for Q1 2020.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub source: String,
    pub queries: Vec<String>,
    pub subreddits: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub retries: RetryBudget,
    pub request_delay_secs: u64,
    pub page_size: u32,
    pub output_dir: PathBuf,
    pub format: PersistFormat,
    pub base_url: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            queries: DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect(),
            subreddits: DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2020, 3, 30).unwrap_or_default(),
            retries: RetryBudget::default(),
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            page_size: MAX_PAGE_SIZE,
            output_dir: PathBuf::from("."),
            format: PersistFormat::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl RetrievalConfig {
    /// Reads a JSON config file. Missing keys fall back to the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queries.is_empty() {
            return Err(Error::Config("at least one query is required".into()));
        }
        if self.subreddits.is_empty() {
            return Err(Error::Config("at least one subreddit is required".into()));
        }
        if self.end_date < self.start_date {
            return Err(Error::Config(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::Config(format!(
                "page size must be within 1..={MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}
