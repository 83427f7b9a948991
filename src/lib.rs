//! Collects Reddit submissions and comments from the pushshift.io archive.
//!
//! A run walks a date range one day at a time, chaining three lookups
//! (submissions, their comment ids, then the comments) and appending each
//! stage's results to date-stamped JSON files.

pub mod config;
pub mod date;
pub mod driver;
mod error;
pub mod export;
pub mod source;

pub use config::{PersistFormat, RetrievalConfig, RetryBudget};
pub use date::DayWindow;
pub use driver::{OutputStems, RetrievalDriver, RunStats};
pub use error::{Error, Result};
pub use export::JsonExporter;
pub use source::{CommentLink, DataSource, NO_COMMENTS, PushshiftClient, select_source};
