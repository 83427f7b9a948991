use chrono::{Local, NaiveDate, TimeZone};

/// One calendar day's `(after, before)` window in UNIX seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub after: i64,
    pub before: i64,
}

pub fn day_buckets(start: NaiveDate, end: NaiveDate) -> Vec<i64> {
    day_buckets_in(&Local, start, end)
}

/// Midnight timestamps in `tz` for every day in `[start, end]`, inclusive.
/// Empty when `end < start`.
pub fn day_buckets_in<Tz: TimeZone>(tz: &Tz, start: NaiveDate, end: NaiveDate) -> Vec<i64> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| midnight_timestamp(tz, day))
        .collect()
}

pub fn day_windows(buckets: &[i64]) -> Vec<DayWindow> {
    buckets
        .windows(2)
        .map(|pair| DayWindow {
            after: pair[0],
            before: pair[1],
        })
        .collect()
}

pub fn today_suffix() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn midnight_timestamp<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> i64 {
    let naive = day.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.timestamp(),
        // midnight skipped by a DST jump
        None => tz.from_utc_datetime(&naive).timestamp(),
    }
}
