//! Due-date parsing and formatting helpers.
//!
//! Natural-language due input is accepted both from CLI flags and from the
//! coach's task-creation phrases.

use chrono::{Datelike, Duration, Local, NaiveDate};

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow"
/// - bare weekday names ("friday"), "next friday"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    parse_due_from(s, Local::now().date_naive())
}

/// Same as [`parse_due_input`] with an explicit "today" for testability.
pub fn parse_due_from(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    // "in X" patterns
    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    // Weekday patterns
    let weekdays = [
        ("monday", 0),
        ("tuesday", 1),
        ("wednesday", 2),
        ("thursday", 3),
        ("friday", 4),
        ("saturday", 5),
        ("sunday", 6),
    ];
    for (day_name, target_day) in weekdays {
        let current_day = today.weekday().num_days_from_monday() as i32;
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name {
            return Some(today + Duration::days(days_ahead as i64));
        }
        if s == format!("next {day_name}") {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add as i64));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {delta}d")
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn simple_phrases() {
        let today = day(2026, 8, 28); // a Friday
        assert_eq!(parse_due_from("today", today), Some(today));
        assert_eq!(parse_due_from("tomorrow", today), Some(day(2026, 8, 29)));
        assert_eq!(parse_due_from("in 3d", today), Some(day(2026, 8, 31)));
        assert_eq!(parse_due_from("in 1w", today), Some(day(2026, 9, 4)));
        assert_eq!(parse_due_from("2026-12-24", today), Some(day(2026, 12, 24)));
        assert_eq!(parse_due_from("someday", today), None);
    }

    #[test]
    fn weekday_phrases() {
        let friday = day(2026, 8, 28);
        // Bare weekday resolves within the current week, same day included.
        assert_eq!(parse_due_from("friday", friday), Some(friday));
        assert_eq!(parse_due_from("monday", friday), Some(day(2026, 8, 31)));
        // "next" always jumps at least a week ahead.
        assert_eq!(parse_due_from("next friday", friday), Some(day(2026, 9, 4)));
    }

    #[test]
    fn relative_formatting() {
        let today = day(2026, 8, 28);
        assert_eq!(format_due_relative(None, today), "-");
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(format_due_relative(Some(day(2026, 8, 30)), today), "in 2d");
        assert_eq!(format_due_relative(Some(day(2026, 8, 26)), today), "2d late");
    }
}
