use chrono::{DateTime, NaiveDate};

const DAYS_PER_WEEK: i64 = 7;
const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_YEAR: i64 = 365;

/// Whole calendar days from `from` to `to`; negative when `to` precedes `from`.
pub fn whole_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Parses a backend date, either a plain `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Timestamps keep the calendar date of their own offset; the time of day is
/// dropped because the estimator works in whole days.
pub fn parse_backend_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.date_naive())
}

/// Converts a plan term such as `"12 Months"`, `"1 Year"` or `"365 days"` to days.
///
/// Months count as 30 days and years as 365. A bare number is read as days.
pub fn parse_term_days(raw: &str) -> Option<u32> {
    let lowered = raw.trim().to_ascii_lowercase();
    let digits_end = lowered
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lowered.len());
    if digits_end == 0 {
        return None;
    }
    let count: i64 = lowered[..digits_end].parse().ok()?;
    let unit = lowered[digits_end..].trim();

    let per_unit = if unit.is_empty() || unit.starts_with('d') {
        1
    } else if unit.starts_with('w') {
        DAYS_PER_WEEK
    } else if unit.starts_with('m') {
        DAYS_PER_MONTH
    } else if unit.starts_with('y') {
        DAYS_PER_YEAR
    } else {
        return None;
    };

    let days = count.checked_mul(per_unit)?;
    if days <= 0 {
        return None;
    }
    u32::try_from(days).ok()
}
