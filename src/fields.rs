//! Enumerations and field types for task management.
//!
//! This module defines the structured data types used to categorise tasks:
//! priority levels, the category icon vocabulary, insight kinds, and the
//! transient list filter.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority classification for task importance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// True for the priorities surfaced in "needs attention" counts.
    pub fn is_high_or_urgent(self) -> bool {
        matches!(self, Priority::High | Priority::Urgent)
    }
}

/// Format a priority level for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
        Priority::Urgent => "Urgent",
    }
}

/// Parse a priority keyword, e.g. from coach input.
pub fn parse_priority(s: &str) -> Option<Priority> {
    match s.to_lowercase().as_str() {
        "low" => Some(Priority::Low),
        "medium" | "normal" => Some(Priority::Medium),
        "high" | "important" => Some(Priority::High),
        "urgent" | "critical" | "asap" => Some(Priority::Urgent),
        _ => None,
    }
}

/// Fixed icon vocabulary for categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryIcon {
    #[default]
    Folder,
    Briefcase,
    Home,
    Heart,
    Star,
    Book,
    Cart,
    Wrench,
}

impl CategoryIcon {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryIcon::Folder => "folder",
            CategoryIcon::Briefcase => "briefcase",
            CategoryIcon::Home => "home",
            CategoryIcon::Heart => "heart",
            CategoryIcon::Star => "star",
            CategoryIcon::Book => "book",
            CategoryIcon::Cart => "cart",
            CategoryIcon::Wrench => "wrench",
        }
    }
}

/// Classification of locally generated coaching insights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Productivity,
    Pattern,
    Suggestion,
    Reminder,
}

/// Transient view-state filter over the task collection. Not persisted.
///
/// The search string doubles as a date-equality query when prefixed with
/// `due:` (e.g. `due:2026-09-01`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Filter {
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    #[serde(default)]
    pub search: String,
}

impl Filter {
    /// True when no criterion is set; matches everything.
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.search.trim().is_empty()
    }

    /// Extract the date from a `due:<date>` sentinel search, if present.
    pub fn due_sentinel(&self) -> Option<NaiveDate> {
        let rest = self.search.trim().strip_prefix("due:")?;
        NaiveDate::parse_from_str(rest.trim(), "%Y-%m-%d").ok()
    }
}

/// Validate a 6-digit hex colour value such as `#ff8800` or `ff8800`.
pub fn is_valid_hex_color(s: &str) -> bool {
    let hex = s.strip_prefix('#').unwrap_or(s);
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
