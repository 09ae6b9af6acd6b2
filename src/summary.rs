//! Derived task metrics and locally generated insights.
//!
//! Everything here is a pure computation over the in-memory task
//! collection; nothing touches the backend. Calendar arithmetic uses the
//! local calendar, the same clock due-date parsing resolves "today"
//! against.

use std::collections::BTreeMap;

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::fields::{InsightKind, Priority};
use crate::task::{AiInsight, Task};

/// Bucket label for tasks without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Streaks are only counted this far back.
const STREAK_CAP_DAYS: i64 = 30;

/// Read-only aggregate snapshot of the task collection, used to drive
/// dashboards and coaching responses.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Completed tasks whose *creation* date is today. This deliberately
    /// keys off creation, not completion: a task created yesterday and
    /// finished today does not count.
    pub completed_today: usize,
    pub due_today: usize,
    pub overdue: usize,
    /// High or urgent priority among active tasks.
    pub high_priority: usize,
    /// Urgent priority among active tasks.
    pub urgent: usize,
    pub by_category: BTreeMap<String, usize>,
    /// completed / total as a percentage, rounded to nearest; 0 when empty.
    pub completion_rate: u32,
    /// Consecutive days, counting back from today (capped at 30), on which
    /// at least one task created that day is completed.
    pub streak_days: u32,
    /// Trailing 7-day daily average of task creation, one decimal.
    pub daily_created_avg: f64,
}

pub fn derive(tasks: &[Task]) -> TaskSummary {
    derive_at(tasks, Local::now().date_naive())
}

/// Summary derivation with an explicit "today" for testability.
pub fn derive_at(tasks: &[Task], today: NaiveDate) -> TaskSummary {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let active = total - completed;

    let created_on = |t: &Task| t.created_at.with_timezone(&Local).date_naive();

    let completed_today = tasks
        .iter()
        .filter(|t| t.completed && created_on(t) == today)
        .count();
    let due_today = tasks
        .iter()
        .filter(|t| !t.completed && t.due_date == Some(today))
        .count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(today)).count();
    let high_priority = tasks
        .iter()
        .filter(|t| !t.completed && t.priority.is_high_or_urgent())
        .count();
    let urgent = tasks
        .iter()
        .filter(|t| !t.completed && t.priority == Priority::Urgent)
        .count();

    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    for t in tasks {
        let bucket = t
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        *by_category.entry(bucket).or_default() += 1;
    }

    let completion_rate = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    };

    let mut streak_days = 0u32;
    for offset in 0..STREAK_CAP_DAYS {
        let day = today - Duration::days(offset);
        let hit = tasks
            .iter()
            .any(|t| t.completed && created_on(t) == day);
        if hit {
            streak_days += 1;
        } else {
            break;
        }
    }

    let window_start = today - Duration::days(6);
    let created_in_window = tasks
        .iter()
        .filter(|t| {
            let d = created_on(t);
            d >= window_start && d <= today
        })
        .count();
    let daily_created_avg = (created_in_window as f64 / 7.0 * 10.0).round() / 10.0;

    TaskSummary {
        total,
        completed,
        active,
        completed_today,
        due_today,
        overdue,
        high_priority,
        urgent,
        by_category,
        completion_rate,
        streak_days,
        daily_created_avg,
    }
}

/// Rule-derived coaching insights over the current collection.
pub fn generate_insights(summary: &TaskSummary, tasks: &[Task]) -> Vec<AiInsight> {
    let today = Local::now().date_naive();
    let mut insights = Vec::new();

    if summary.overdue > 0 {
        let related: Vec<String> = tasks
            .iter()
            .filter(|t| t.is_overdue(today))
            .map(|t| t.id.clone())
            .collect();
        insights.push(AiInsight::new(
            InsightKind::Reminder,
            format!(
                "{} task{} overdue. Knock out the oldest one first to clear the backlog.",
                summary.overdue,
                if summary.overdue == 1 { " is" } else { "s are" }
            ),
            related,
        ));
    }

    if summary.urgent > 0 {
        let related: Vec<String> = tasks
            .iter()
            .filter(|t| !t.completed && t.priority == Priority::Urgent)
            .map(|t| t.id.clone())
            .collect();
        insights.push(AiInsight::new(
            InsightKind::Suggestion,
            format!(
                "You have {} urgent task{} open. Consider doing those before anything new.",
                summary.urgent,
                if summary.urgent == 1 { "" } else { "s" }
            ),
            related,
        ));
    }

    if summary.total >= 5 && summary.completion_rate < 30 {
        insights.push(AiInsight::new(
            InsightKind::Pattern,
            format!(
                "Only {}% of your tasks are done. Breaking large tasks into subtasks can help.",
                summary.completion_rate
            ),
            Vec::new(),
        ));
    }

    if summary.streak_days >= 3 {
        insights.push(AiInsight::new(
            InsightKind::Productivity,
            format!(
                "{}-day completion streak. Keep it going!",
                summary.streak_days
            ),
            Vec::new(),
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    // Mid-morning local wall time, so the local calendar date matches the
    // given date regardless of the machine's offset.
    fn at(date: NaiveDate) -> DateTime<Utc> {
        Local
            .from_local_datetime(&date.and_hms_opt(10, 0, 0).unwrap())
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn task(title: &str, created: NaiveDate, completed: bool) -> Task {
        Task {
            id: title.to_string(),
            title: title.to_string(),
            description: None,
            completed,
            created_at: at(created),
            completed_at: if completed { Some(at(created)) } else { None },
            due_date: None,
            priority: Priority::Medium,
            category: None,
            tags: Vec::new(),
            ai_generated: false,
            ai_suggestions: Vec::new(),
            parent_id: None,
            sort_order: 0,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_collection_is_all_zeroes() {
        let s = derive_at(&[], day(2026, 8, 28));
        assert_eq!(s.total, 0);
        assert_eq!(s.completed, 0);
        assert_eq!(s.active, 0);
        assert_eq!(s.completion_rate, 0);
        assert_eq!(s.streak_days, 0);
        assert_eq!(s.daily_created_avg, 0.0);
        assert!(s.by_category.is_empty());
    }

    #[test]
    fn single_task_created_and_completed_today() {
        let today = day(2026, 8, 28);
        let s = derive_at(&[task("t", today, true)], today);
        assert_eq!(s.completed_today, 1);
        assert_eq!(s.completion_rate, 100);
        assert_eq!(s.streak_days, 1);
    }

    #[test]
    fn completed_today_keys_off_creation_date() {
        let today = day(2026, 8, 28);
        let yesterday = day(2026, 8, 27);
        // Created yesterday, completed today: does NOT count.
        let mut t = task("t", yesterday, true);
        t.completed_at = Some(at(today));
        let s = derive_at(&[t], today);
        assert_eq!(s.completed_today, 0);
    }

    #[test]
    fn due_and_overdue_counts_skip_completed() {
        let today = day(2026, 8, 28);
        let mut due_today = task("due", today, false);
        due_today.due_date = Some(today);
        let mut overdue = task("late", day(2026, 8, 20), false);
        overdue.due_date = Some(day(2026, 8, 25));
        let mut done_late = task("done", day(2026, 8, 20), true);
        done_late.due_date = Some(day(2026, 8, 25));

        let s = derive_at(&[due_today, overdue, done_late], today);
        assert_eq!(s.due_today, 1);
        assert_eq!(s.overdue, 1);
    }

    #[test]
    fn priority_counts_only_active_tasks() {
        let today = day(2026, 8, 28);
        let mut urgent = task("u", today, false);
        urgent.priority = Priority::Urgent;
        let mut high = task("h", today, false);
        high.priority = Priority::High;
        let mut done_urgent = task("du", today, true);
        done_urgent.priority = Priority::Urgent;

        let s = derive_at(&[urgent, high, done_urgent], today);
        assert_eq!(s.high_priority, 2);
        assert_eq!(s.urgent, 1);
    }

    #[test]
    fn category_histogram_has_uncategorized_bucket() {
        let today = day(2026, 8, 28);
        let mut work = task("w", today, false);
        work.category = Some("Work".into());
        let loose = task("l", today, false);

        let s = derive_at(&[work, loose], today);
        assert_eq!(s.by_category.get("Work"), Some(&1));
        assert_eq!(s.by_category.get(UNCATEGORIZED), Some(&1));
    }

    #[test]
    fn streak_breaks_on_first_gap() {
        let today = day(2026, 8, 28);
        let tasks = vec![
            task("a", today, true),
            task("b", day(2026, 8, 27), true),
            // gap on the 26th
            task("c", day(2026, 8, 25), true),
        ];
        let s = derive_at(&tasks, today);
        assert_eq!(s.streak_days, 2);
    }

    #[test]
    fn streak_caps_at_thirty() {
        let today = day(2026, 8, 28);
        let tasks: Vec<Task> = (0..40)
            .map(|i| task(&format!("t{i}"), today - Duration::days(i), true))
            .collect();
        let s = derive_at(&tasks, today);
        assert_eq!(s.streak_days, 30);
    }

    #[test]
    fn creation_average_is_one_decimal() {
        let today = day(2026, 8, 28);
        // 3 tasks inside the 7-day window, 1 outside.
        let tasks = vec![
            task("a", today, false),
            task("b", day(2026, 8, 26), false),
            task("c", day(2026, 8, 22), false),
            task("old", day(2026, 8, 1), false),
        ];
        let s = derive_at(&tasks, today);
        assert_eq!(s.daily_created_avg, 0.4); // 3/7 = 0.428... -> 0.4
    }

    #[test]
    fn completion_rate_rounds() {
        let today = day(2026, 8, 28);
        let tasks = vec![
            task("a", today, true),
            task("b", today, false),
            task("c", today, false),
        ];
        let s = derive_at(&tasks, today);
        assert_eq!(s.completion_rate, 33);
    }

    #[test]
    fn parsed_today_is_due_today() {
        // Due parsing and summary derivation must agree on what "today" is.
        let today = Local::now().date_naive();
        let mut t = task("t", today, false);
        t.due_date = crate::dates::parse_due_input("today");
        let s = derive(&[t]);
        assert_eq!(s.due_today, 1);
        assert_eq!(s.overdue, 0);
    }

    #[test]
    fn insights_cover_overdue_and_urgent() {
        let today = Local::now().date_naive();
        let mut overdue = task("late", today - Duration::days(3), false);
        overdue.due_date = Some(today - Duration::days(2));
        let mut urgent = task("fire", today, false);
        urgent.priority = Priority::Urgent;
        let tasks = vec![overdue, urgent];

        let insights = generate_insights(&derive_at(&tasks, today), &tasks);
        assert!(insights
            .iter()
            .any(|i| i.kind == InsightKind::Reminder && i.related_task_ids == ["late"]));
        assert!(insights
            .iter()
            .any(|i| i.kind == InsightKind::Suggestion && i.related_task_ids == ["fire"]));
    }
}
