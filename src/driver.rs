use std::ops::AddAssign;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::Result;
use crate::config::RetrievalConfig;
use crate::date::{DayWindow, day_buckets, day_windows, today_suffix};
use crate::export::JsonExporter;
use crate::source::{CommentLink, DataSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStems {
    pub submissions: String,
    pub comment_links: String,
    pub comments: String,
}

impl OutputStems {
    pub fn for_date(date_suffix: &str) -> Self {
        Self {
            submissions: format!("submissions_{date_suffix}"),
            comment_links: format!("submission_id_to_comment_id_{date_suffix}"),
            comments: format!("comments_{date_suffix}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub windows: usize,
    pub submissions: usize,
    pub comment_links: usize,
    pub comment_batches: usize,
    pub comments: usize,
    /// Stages that gave up after exhausting their retries.
    pub failed_stages: usize,
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.windows += other.windows;
        self.submissions += other.submissions;
        self.comment_links += other.comment_links;
        self.comment_batches += other.comment_batches;
        self.comments += other.comments;
        self.failed_stages += other.failed_stages;
    }
}

/// Walks `config` day by day, chaining submissions into comment ids into
/// comments and persisting each stage as it arrives.
pub struct RetrievalDriver<'a> {
    source: &'a dyn DataSource,
    config: &'a RetrievalConfig,
    exporter: JsonExporter,
}

impl<'a> RetrievalDriver<'a> {
    pub fn new(source: &'a dyn DataSource, config: &'a RetrievalConfig) -> Self {
        Self {
            source,
            config,
            exporter: JsonExporter::new(&config.output_dir, config.format),
        }
    }

    pub async fn run_all(&self) -> Result<RunStats> {
        let mut total = RunStats::default();
        for query in &self.config.queries {
            info!(query, "running query");
            for subreddit in &self.config.subreddits {
                info!(subreddit, "running in subreddit");
                total += self.run_query(query, subreddit).await?;
            }
        }

        info!(
            windows = total.windows,
            submissions = total.submissions,
            comment_links = total.comment_links,
            comment_batches = total.comment_batches,
            comments = total.comments,
            failed_stages = total.failed_stages,
            "retrieval finished"
        );
        Ok(total)
    }

    /// One query in one subreddit over the configured date range. Output
    /// goes to files named after today's date.
    pub async fn run_query(&self, query: &str, subreddit: &str) -> Result<RunStats> {
        let stems = OutputStems::for_date(&today_suffix());
        let buckets = day_buckets(self.config.start_date, self.config.end_date);
        self.run_windows(query, subreddit, &day_windows(&buckets), &stems)
            .await
    }

    pub async fn run_windows(
        &self,
        query: &str,
        subreddit: &str,
        windows: &[DayWindow],
        stems: &OutputStems,
    ) -> Result<RunStats> {
        let mut stats = RunStats::default();

        for window in windows {
            stats.windows += 1;
            let submissions = match self
                .source
                .fetch_submissions(query, subreddit, *window, self.config.retries.submissions)
                .await
            {
                Ok(submissions) => submissions,
                Err(e) => {
                    error!(query, subreddit, after = window.after, error = %e, "skipping window");
                    stats.failed_stages += 1;
                    continue;
                }
            };

            self.exporter.append(&stems.submissions, &submissions)?;
            stats.submissions += submissions.len();

            for submission_id in submission_ids(&submissions) {
                stats += self.collect_comments(submission_id, stems).await?;
            }
        }

        Ok(stats)
    }

    async fn collect_comments(&self, submission_id: &str, stems: &OutputStems) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let links = self
            .source
            .fetch_comment_ids(submission_id, self.config.retries.comment_ids)
            .await?;
        self.exporter.append(&stems.comment_links, &links)?;
        stats.comment_links += links.len();

        if links.first().is_none_or(CommentLink::is_sentinel) {
            return Ok(stats);
        }

        let comment_ids: Vec<String> = links.into_iter().map(|l| l.comment_id).collect();
        match self
            .source
            .fetch_comments(&comment_ids, self.config.retries.comments)
            .await
        {
            Ok(comments) => {
                self.exporter.append(&stems.comments, &comments)?;
                stats.comment_batches += 1;
                stats.comments += comments.len();
            }
            Err(e) => {
                error!(submission_id, error = %e, "skipping comments");
                stats.failed_stages += 1;
            }
        }
        Ok(stats)
    }
}

/// The `id` of every submission object, skipping ones without a string id.
pub fn submission_ids(submissions: &[Value]) -> Vec<&str> {
    submissions
        .iter()
        .filter_map(|submission| {
            let id = submission.get("id").and_then(Value::as_str);
            if id.is_none() {
                warn!(%submission, "submission has no id");
            }
            id
        })
        .collect()
}
