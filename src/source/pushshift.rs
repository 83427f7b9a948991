use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::{CommentLink, DataSource};
use crate::config::RetrievalConfig;
use crate::date::DayWindow;
use crate::export::JsonExporter;
use crate::{Error, Result};

pub const SUBMISSIONS_ERROR_LOG: &str = "submissions_error";
pub const COMMENT_IDS_ERROR_LOG: &str = "submission_id_error";
pub const COMMENTS_ERROR_LOG: &str = "comment_error";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 60;

/// Every pushshift endpoint wraps its results in `data`.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

/// Client for the pushshift.io Reddit archive.
///
/// Each request is followed by a fixed courtesy delay whether it succeeded
/// or not. Failed request urls are appended to per-stage error logs in the
/// output directory.
#[derive(Debug, Clone)]
pub struct PushshiftClient {
    client: reqwest::Client,
    base_url: String,
    request_delay: Duration,
    page_size: u32,
    error_log: JsonExporter,
}

impl PushshiftClient {
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_delay: Duration::from_secs(config.request_delay_secs),
            page_size: config.page_size,
            error_log: JsonExporter::new(&config.output_dir, config.format),
        })
    }

    pub fn submissions_url(&self, query: &str, subreddit: &str, window: DayWindow) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/search/submission/", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("subreddit", subreddit)
            .append_pair("after", &window.after.to_string())
            .append_pair("before", &window.before.to_string())
            .append_pair("limit", &self.page_size.to_string());
        Ok(url)
    }

    pub fn comment_ids_url(&self, submission_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/submission/comment_ids/", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push(submission_id);
        Ok(url)
    }

    pub fn comments_url(&self, comment_ids: &[String]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/search/comment", self.base_url))?;
        url.query_pairs_mut().append_pair("ids", &comment_ids.join(","));
        Ok(url)
    }

    /// GETs `url` up to `retries + 1` times, logging each failed attempt to
    /// `<error_log>.txt`.
    async fn get_with_retries<T: DeserializeOwned>(
        &self,
        url: &Url,
        retries: u32,
        error_log: &str,
    ) -> Result<T> {
        let attempts = retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!(%url, attempt, "requesting");
            let outcome = self.get_once::<T>(url).await;
            tokio::time::sleep(self.request_delay).await;

            match outcome {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(%url, attempt, attempts, error = %e, "request failed");
                    info!(file = error_log, "export error file");
                    self.error_log.append_error(error_log, url.as_str())?;
                    last_error = e.to_string();
                }
            }
        }

        Err(Error::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last: last_error,
        })
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let body = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DataSource for PushshiftClient {
    async fn fetch_submissions(
        &self,
        query: &str,
        subreddit: &str,
        window: DayWindow,
        retries: u32,
    ) -> Result<Vec<Value>> {
        let url = self.submissions_url(query, subreddit, window)?;
        let envelope: DataEnvelope<Value> = self
            .get_with_retries(&url, retries, SUBMISSIONS_ERROR_LOG)
            .await?;
        Ok(envelope.data)
    }

    async fn fetch_comment_ids(
        &self,
        submission_id: &str,
        retries: u32,
    ) -> Result<Vec<CommentLink>> {
        let url = self.comment_ids_url(submission_id)?;
        let comment_ids = match self
            .get_with_retries::<DataEnvelope<String>>(&url, retries, COMMENT_IDS_ERROR_LOG)
            .await
        {
            Ok(envelope) => envelope.data,
            Err(Error::RetriesExhausted { attempts, last, .. }) => {
                warn!(submission_id, attempts, error = %last, "comment ids unavailable");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        if comment_ids.is_empty() {
            return Ok(vec![CommentLink::no_comments(submission_id)]);
        }

        Ok(comment_ids
            .into_iter()
            .map(|comment_id| CommentLink::new(submission_id, comment_id))
            .collect())
    }

    async fn fetch_comments(&self, comment_ids: &[String], retries: u32) -> Result<Vec<Value>> {
        let url = self.comments_url(comment_ids)?;
        let envelope: DataEnvelope<Value> = self
            .get_with_retries(&url, retries, COMMENTS_ERROR_LOG)
            .await?;
        Ok(envelope.data)
    }
}
