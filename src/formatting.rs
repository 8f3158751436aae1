//! Shared formatting helpers for the CLI report and the dashboard.

use chrono::DateTime;
use chrono_tz::Tz;

/// Layout constants used across CLI and TUI
pub mod layout {
    pub const BOX_WIDTH: usize = 78;
    pub const NAME_TRUNCATE_LEN: usize = 24;
    pub const REASON_TRUNCATE_LEN: usize = 32;
}

/// Placeholder for values the scheduler did not give us.
pub const UNKNOWN: &str = "unknown";

/// Truncate a string to a maximum length (in characters), adding "..." at the end if truncated.
///
/// This function is Unicode-safe and counts characters, not bytes.
///
/// # Examples
/// ```
/// use qwatch::formatting::truncate_string;
/// assert_eq!(truncate_string("hello", 10), "hello");
/// assert_eq!(truncate_string("hello world", 8), "hello...");
/// assert_eq!(truncate_string("ab", 2), "ab");
/// ```
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format duration in verbose human-readable style (e.g., "2d 3h", "5h 30m").
///
/// Shows at most 2 time units.
///
/// # Examples
/// ```
/// use qwatch::formatting::format_duration_human;
/// assert_eq!(format_duration_human(0), "0s");
/// assert_eq!(format_duration_human(3660), "1h 1m");
/// assert_eq!(format_duration_human(90000), "1d 1h");
/// ```
#[must_use]
pub fn format_duration_human(seconds: u64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }

    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    } else if hours > 0 {
        if minutes > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}h", hours)
        }
    } else if minutes > 0 {
        if secs > 0 {
            format!("{}m {}s", minutes, secs)
        } else {
            format!("{}m", minutes)
        }
    } else {
        format!("{}s", secs)
    }
}

/// Wait time for display. Submit times in the future (clock skew) show as 0s.
#[must_use]
pub fn format_wait(waited_secs: Option<i64>) -> String {
    match waited_secs {
        Some(secs) => format_duration_human(secs.max(0).unsigned_abs()),
        None => UNKNOWN.to_string(),
    }
}

/// Wall-clock time in the reference zone, or "unknown".
#[must_use]
pub fn format_timestamp(time: Option<&DateTime<Tz>>) -> String {
    time.map_or_else(|| UNKNOWN.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[must_use]
pub fn format_priority(priority: Option<i64>) -> String {
    priority.map_or_else(|| "unresolved".to_string(), |p| p.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 3), "abc");
        assert_eq!(truncate_string("abcd", 3), "abc");
        assert_eq!(truncate_string("abcdefgh", 6), "abc...");
    }

    #[test]
    fn test_truncate_string_unicode() {
        let chinese = "\u{4e2d}\u{6587}\u{6d4b}\u{8bd5}";
        assert_eq!(truncate_string(chinese, 4), chinese);
        assert_eq!(truncate_string(chinese, 3), "\u{4e2d}\u{6587}\u{6d4b}");

        let emoji = "\u{1F600}\u{1F601}\u{1F602}";
        assert_eq!(truncate_string(emoji, 2), "\u{1F600}\u{1F601}");
    }

    #[test]
    fn test_format_duration_human() {
        assert_eq!(format_duration_human(45), "45s");
        assert_eq!(format_duration_human(65), "1m 5s");
        assert_eq!(format_duration_human(3600), "1h");
        assert_eq!(format_duration_human(86400), "1d");
    }

    #[test]
    fn test_format_wait() {
        assert_eq!(format_wait(Some(5400)), "1h 30m");
        assert_eq!(format_wait(Some(-30)), "0s");
        assert_eq!(format_wait(None), "unknown");
    }

    #[test]
    fn test_format_timestamp_and_priority() {
        let t = chrono_tz::US::Pacific
            .with_ymd_and_hms(2025, 1, 15, 9, 30, 0)
            .single()
            .unwrap();
        assert_eq!(format_timestamp(Some(&t)), "2025-01-15 09:30:00");
        assert_eq!(format_timestamp(None), "unknown");
        assert_eq!(format_priority(Some(700)), "700");
        assert_eq!(format_priority(None), "unresolved");
    }
}
