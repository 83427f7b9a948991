use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::config::RetrievalConfig;
use crate::date::DayWindow;

pub mod pushshift;

pub use pushshift::PushshiftClient;

/// Comment id recorded for a submission that has no comments.
pub const NO_COMMENTS: &str = "N/A";

pub const SOURCE_KEYS: [&str; 1] = ["reddit-historical"];

/// One `submission -> comment` edge as written to the id-mapping file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentLink {
    pub submission_id: String,
    pub comment_id: String,
}

impl CommentLink {
    pub fn new(submission_id: impl Into<String>, comment_id: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            comment_id: comment_id.into(),
        }
    }

    pub fn no_comments(submission_id: impl Into<String>) -> Self {
        Self::new(submission_id, NO_COMMENTS)
    }

    pub fn is_sentinel(&self) -> bool {
        self.comment_id == NO_COMMENTS
    }
}

/// The three chained lookups a historical source must provide.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Submissions matching `query` in `subreddit` created inside `window`.
    async fn fetch_submissions(
        &self,
        query: &str,
        subreddit: &str,
        window: DayWindow,
        retries: u32,
    ) -> Result<Vec<Value>>;

    /// Comment ids of one submission, in endpoint order. Never empty: a
    /// submission without comments, or whose lookup keeps failing, yields a
    /// single [`NO_COMMENTS`] link.
    async fn fetch_comment_ids(
        &self,
        submission_id: &str,
        retries: u32,
    ) -> Result<Vec<CommentLink>>;

    async fn fetch_comments(&self, comment_ids: &[String], retries: u32) -> Result<Vec<Value>>;
}

/// Builds the source registered under `key` (case-insensitive).
/// Returns `Ok(None)` for unknown keys.
pub fn select_source(key: &str, config: &RetrievalConfig) -> Result<Option<Box<dyn DataSource>>> {
    match key.to_lowercase().as_str() {
        "reddit-historical" => Ok(Some(Box::new(PushshiftClient::new(config)?))),
        _ => Ok(None),
    }
}
