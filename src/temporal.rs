use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

/// ISO-8601 week number together with the ISO year it belongs to.
///
/// ISO weeks run Monday through Sunday and are anchored on Thursday: shift
/// the date to the Thursday of its own week, then count weeks from that
/// year's January 1. Year-boundary dates therefore land in the neighboring
/// ISO year when their Thursday does (2023-01-01 is week 52 of ISO 2022).
pub fn iso_week_year(date: NaiveDate) -> (u32, i32) {
    let weekday = i64::from(date.weekday().number_from_monday());
    let thursday = date + Duration::days(4 - weekday);
    (thursday.ordinal0() / 7 + 1, thursday.year())
}

/// ISO week number alone, for callers that filter by week within a year.
pub fn iso_week(date: NaiveDate) -> u32 {
    iso_week_year(date).0
}

/// Parse a free-form duration string ("1h 20m 5s", "45m", "2h5s") into
/// seconds. Tokens may appear in any subset and order; a missing unit
/// contributes 0. Empty or unparseable input yields 0 rather than an error.
pub fn parse_duration(text: &str) -> u64 {
    let mut total = 0u64;
    let mut digits = String::new();

    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch.to_ascii_lowercase() {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => {
                digits.clear();
                continue;
            }
        };
        if let Ok(value) = digits.parse::<u64>() {
            total = total.saturating_add(value.saturating_mul(unit));
        }
        digits.clear();
    }

    total
}

/// Format seconds as "2h 5m 30s", omitting zero-valued units. Zero renders
/// as "0s". Round-trips through [`parse_duration`] for any value.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = total_secs % 3600 / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// Best-effort parse of the date strings the sheets actually contain.
/// Returns None for anything unrecognized; callers treat that as undated.
pub fn parse_sheet_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    const FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%B %d, %Y", "%b %d, %Y"];
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Records grouped by `(iso_year, iso_week)`, plus a visible bucket for
/// records whose date column could not be parsed. The union of all buckets
/// equals the input set.
#[derive(Debug, Clone)]
pub struct WeekBuckets<T> {
    pub weeks: BTreeMap<(i32, u32), Vec<T>>,
    pub undated: Vec<T>,
}

impl<T> Default for WeekBuckets<T> {
    fn default() -> Self {
        WeekBuckets {
            weeks: BTreeMap::new(),
            undated: Vec::new(),
        }
    }
}

/// Group records into ISO-week buckets using `date_of` to extract each
/// record's date. Undated records go to the visible `undated` bucket so a
/// dashboard can audit them instead of silently losing rows.
pub fn bucket_by_week<T, F>(records: impl IntoIterator<Item = T>, date_of: F) -> WeekBuckets<T>
where
    F: Fn(&T) -> Option<NaiveDate>,
{
    let mut buckets = WeekBuckets::default();
    for record in records {
        match date_of(&record) {
            Some(date) => {
                let (week, year) = iso_week_year(date);
                buckets.weeks.entry((year, week)).or_default().push(record);
            }
            None => buckets.undated.push(record),
        }
    }
    buckets
}
