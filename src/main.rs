use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use pushshift_spider_rs::source::SOURCE_KEYS;
use pushshift_spider_rs::{PersistFormat, RetrievalConfig, RetrievalDriver, RetryBudget};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    JsonArray,
    JsonLines,
}

impl From<Format> for PersistFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::JsonArray => PersistFormat::JsonArray,
            Format::JsonLines => PersistFormat::JsonLines,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(about, version, author)]
struct Args {
    /// JSON run configuration; flags below override its values
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Search term, repeatable
    #[clap(short = 'Q', long = "query")]
    queries: Vec<String>,

    /// Subreddit, repeatable
    #[clap(short, long = "subreddit")]
    subreddits: Vec<String>,

    /// First day, YYYY-MM-DD
    #[clap(long)]
    start: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD (inclusive)
    #[clap(long)]
    end: Option<NaiveDate>,

    /// Extra attempts per request, applied to every stage
    #[clap(short, long)]
    retries: Option<u32>,

    #[clap(long)]
    delay_secs: Option<u64>,

    #[clap(long)]
    page_size: Option<u32>,

    #[clap(short, long)]
    output_dir: Option<PathBuf>,

    #[clap(short, long, value_enum)]
    format: Option<Format>,

    /// Data source key
    #[clap(long)]
    source: Option<String>,

    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> Result<RetrievalConfig> {
        let mut config = match &self.config {
            Some(path) => RetrievalConfig::from_json_file(path)?,
            None => RetrievalConfig::default(),
        };

        if !self.queries.is_empty() {
            config.queries = self.queries;
        }
        if !self.subreddits.is_empty() {
            config.subreddits = self.subreddits;
        }
        if let Some(start) = self.start {
            config.start_date = start;
        }
        if let Some(end) = self.end {
            config.end_date = end;
        }
        if let Some(retries) = self.retries {
            config.retries = RetryBudget::uniform(retries);
        }
        if let Some(delay) = self.delay_secs {
            config.request_delay_secs = delay;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if let Some(source) = self.source {
            config.source = source;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.into_config()?;
    debug!(?config, "configuration loaded");

    let Some(source) = pushshift_spider_rs::select_source(&config.source, &config)? else {
        bail!(
            "unknown data source {:?}, expected one of {:?}",
            config.source,
            SOURCE_KEYS
        );
    };

    info!(
        source = %config.source,
        from = %config.start_date,
        to = %config.end_date,
        output_dir = %config.output_dir.display(),
        "starting retrieval"
    );
    RetrievalDriver::new(source.as_ref(), &config).run_all().await?;

    Ok(())
}
