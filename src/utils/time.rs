use chrono::NaiveDate;

/// This is the standard way of rendering a bucket date in whovisits.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Short month-day label used by the trend series.
pub fn series_label(date: NaiveDate) -> String {
    date.format("%m-%d").to_string()
}
