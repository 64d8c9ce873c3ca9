use chrono::{DateTime, Utc};

fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an RFC 3339 timestamp as a short date, e.g. "Jul 24, 2024"
pub fn format_date(date: &str) -> String {
    if let Some(dt) = parse_utc(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        // Keep the YYYY-MM-DD prefix
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Format an RFC 3339 timestamp with its time, in UTC
pub fn format_timestamp(timestamp: &str) -> String {
    match parse_utc(timestamp) {
        Some(dt) => dt.format("%b %d, %Y %H:%M").to_string(),
        None => timestamp.to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
