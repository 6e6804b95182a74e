//! Shared fixtures for the integration tests.

#![allow(dead_code, unreachable_pub)]

use caduceus::{Date, Panel};
use chrono::{Datelike, Weekday};

/// Installs a test-writer subscriber once; set `RUST_LOG=debug` to see engine events.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd_opt(y, m, day).unwrap()
}

pub fn business_days(start: Date, end: Date) -> Vec<Date> {
    start
        .iter_days()
        .take_while(|x| *x <= end)
        .filter(|x| !matches!(x.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

pub fn panel(index: Vec<Date>, columns: Vec<(&str, Vec<f64>)>) -> Panel {
    Panel::from_columns(
        index,
        columns.into_iter().map(|(c, v)| (c.to_string(), v)).collect(),
    )
    .unwrap()
}
