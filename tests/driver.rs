use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use pushshift_spider_rs::date::today_suffix;
use pushshift_spider_rs::{
    CommentLink, DataSource, DayWindow, Error, OutputStems, PersistFormat, Result,
    RetrievalConfig, RetrievalDriver,
};
use serde_json::{Value, json};

/// Serves canned submissions per window and comment ids per submission.
#[derive(Default)]
struct FakeSource {
    submissions: HashMap<i64, Vec<Value>>,
    comment_ids: HashMap<String, Vec<String>>,
    failing_windows: Vec<i64>,
    failing_comments: Vec<String>,
    comment_calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl DataSource for FakeSource {
    async fn fetch_submissions(
        &self,
        _query: &str,
        _subreddit: &str,
        window: DayWindow,
        retries: u32,
    ) -> Result<Vec<Value>> {
        if self.failing_windows.contains(&window.after) {
            return Err(Error::RetriesExhausted {
                url: format!("fake://{}", window.after),
                attempts: retries + 1,
                last: "boom".into(),
            });
        }
        Ok(self.submissions.get(&window.after).cloned().unwrap_or_default())
    }

    async fn fetch_comment_ids(
        &self,
        submission_id: &str,
        _retries: u32,
    ) -> Result<Vec<CommentLink>> {
        let ids = self.comment_ids.get(submission_id).cloned().unwrap_or_default();
        if ids.is_empty() {
            return Ok(vec![CommentLink::no_comments(submission_id)]);
        }
        Ok(ids
            .into_iter()
            .map(|id| CommentLink::new(submission_id, id))
            .collect())
    }

    async fn fetch_comments(&self, comment_ids: &[String], retries: u32) -> Result<Vec<Value>> {
        self.comment_calls.lock().unwrap().push(comment_ids.to_vec());
        if comment_ids.iter().any(|id| self.failing_comments.contains(id)) {
            return Err(Error::RetriesExhausted {
                url: format!("fake://comments/{}", comment_ids.join(",")),
                attempts: retries + 1,
                last: "boom".into(),
            });
        }
        Ok(comment_ids.iter().map(|id| json!({"id": id})).collect())
    }
}

fn config_in(dir: &std::path::Path) -> RetrievalConfig {
    RetrievalConfig {
        output_dir: dir.to_path_buf(),
        request_delay_secs: 0,
        ..Default::default()
    }
}

fn read_json(path: std::path::PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

const WINDOWS: [DayWindow; 2] = [
    DayWindow { after: 100, before: 200 },
    DayWindow { after: 200, before: 300 },
];

#[tokio::test]
async fn chains_submissions_into_comments() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource {
        submissions: HashMap::from([
            (100, vec![json!({"id": "s1"}), json!({"id": "s2"})]),
            (200, vec![json!({"id": "s3"})]),
        ]),
        comment_ids: HashMap::from([
            ("s1".to_string(), vec!["c1".to_string(), "c2".to_string()]),
            ("s3".to_string(), vec!["c3".to_string()]),
        ]),
        ..Default::default()
    };
    let config = config_in(dir.path());
    let stems = OutputStems::for_date("2020-04-01");

    let stats = RetrievalDriver::new(&source, &config)
        .run_windows("covid", "Canada", &WINDOWS, &stems)
        .await
        .unwrap();

    assert_eq!(stats.windows, 2);
    assert_eq!(stats.submissions, 3);
    assert_eq!(stats.comment_links, 4);
    assert_eq!(stats.comment_batches, 2);
    assert_eq!(stats.failed_stages, 0);

    assert_eq!(
        read_json(dir.path().join("submissions_2020-04-01.json")),
        json!([[{"id": "s1"}, {"id": "s2"}], [{"id": "s3"}]])
    );
    assert_eq!(
        read_json(dir.path().join("submission_id_to_comment_id_2020-04-01.json")),
        json!([
            [
                {"submission_id": "s1", "comment_id": "c1"},
                {"submission_id": "s1", "comment_id": "c2"}
            ],
            [{"submission_id": "s2", "comment_id": "N/A"}],
            [{"submission_id": "s3", "comment_id": "c3"}]
        ])
    );
    assert_eq!(
        read_json(dir.path().join("comments_2020-04-01.json")),
        json!([[{"id": "c1"}, {"id": "c2"}], [{"id": "c3"}]])
    );
    // s2 has no comments, so no comment request is made for it
    assert_eq!(
        *source.comment_calls.lock().unwrap(),
        vec![vec!["c1".to_string(), "c2".to_string()], vec!["c3".to_string()]]
    );
}

#[tokio::test]
async fn failed_window_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource {
        submissions: HashMap::from([(200, vec![json!({"id": "s3"})])]),
        failing_windows: vec![100],
        ..Default::default()
    };
    let config = config_in(dir.path());
    let stems = OutputStems::for_date("2020-04-01");

    let stats = RetrievalDriver::new(&source, &config)
        .run_windows("covid", "Canada", &WINDOWS, &stems)
        .await
        .unwrap();

    assert_eq!(stats.failed_stages, 1);
    assert_eq!(stats.submissions, 1);
    assert_eq!(
        read_json(dir.path().join("submissions_2020-04-01.json")),
        json!([[{"id": "s3"}]])
    );
    assert!(!dir.path().join("comments_2020-04-01.json").exists());
}

#[tokio::test]
async fn run_all_covers_every_query_and_subreddit() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::default();
    let config = RetrievalConfig {
        queries: vec!["covid".into(), "vaccine".into()],
        subreddits: vec!["Ottawa".into(), "Toronto".into(), "Calgary".into()],
        start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2020, 1, 4).unwrap(),
        format: PersistFormat::JsonLines,
        ..config_in(dir.path())
    };

    let stats = RetrievalDriver::new(&source, &config).run_all().await.unwrap();

    // 4 days give 3 windows, for each of 2 x 3 query/subreddit pairs
    assert_eq!(stats.windows, 18);
    let stems = OutputStems::for_date(&today_suffix());
    let path = dir.path().join(format!("{}.jsonl", stems.submissions));
    let raw = std::fs::read_to_string(path).unwrap();
    assert_eq!(raw.lines().count(), 18);
    assert!(raw.lines().all(|line| line == "[]"));
}

#[tokio::test]
async fn rerun_duplicates_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource {
        submissions: HashMap::from([(100, vec![json!({"id": "s1"})])]),
        ..Default::default()
    };
    let config = config_in(dir.path());
    let stems = OutputStems::for_date("2020-04-01");
    let driver = RetrievalDriver::new(&source, &config);

    driver.run_windows("covid", "Canada", &WINDOWS[..1], &stems).await.unwrap();
    driver.run_windows("covid", "Canada", &WINDOWS[..1], &stems).await.unwrap();

    assert_eq!(
        read_json(dir.path().join("submissions_2020-04-01.json")),
        json!([[{"id": "s1"}], [{"id": "s1"}]])
    );
}

#[tokio::test]
async fn failed_comments_skip_only_that_submission() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource {
        submissions: HashMap::from([(100, vec![json!({"id": "s1"}), json!({"id": "s2"})])]),
        comment_ids: HashMap::from([
            ("s1".to_string(), vec!["c1".to_string()]),
            ("s2".to_string(), vec!["c2".to_string()]),
        ]),
        failing_comments: vec!["c1".to_string()],
        ..Default::default()
    };
    let config = config_in(dir.path());
    let stems = OutputStems::for_date("2020-04-01");

    let stats = RetrievalDriver::new(&source, &config)
        .run_windows("covid", "Canada", &WINDOWS[..1], &stems)
        .await
        .unwrap();

    assert_eq!(stats.failed_stages, 1);
    assert_eq!(stats.comment_links, 2);
    assert_eq!(stats.comment_batches, 1);
    assert_eq!(
        read_json(dir.path().join("comments_2020-04-01.json")),
        json!([[{"id": "c2"}]])
    );
    assert_eq!(source.comment_calls.lock().unwrap().len(), 2);
}
