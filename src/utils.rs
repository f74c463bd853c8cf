use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (not sample variance).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// (year, month) key used to bucket dates by calendar month.
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

pub fn distinct_months<I>(dates: I) -> BTreeSet<(i32, u32)>
where
    I: IntoIterator<Item = NaiveDate>,
{
    dates.into_iter().map(month_key).collect()
}

pub fn distinct_month_count<I>(dates: I) -> usize
where
    I: IntoIterator<Item = NaiveDate>,
{
    distinct_months(dates).len()
}

/// Number of days covered by the dates, inclusive of both endpoints.
/// Returns 0 for an empty set and 1 for a single date.
pub fn history_span_days(dates: &[NaiveDate]) -> i64 {
    match (dates.iter().min(), dates.iter().max()) {
        (Some(first), Some(last)) => (*last - *first).num_days() + 1,
        _ => 0,
    }
}
