//! Core entity definitions: tasks, categories, tags and insights.
//!
//! `Task` is the unit of work. A task whose `parent_id` references another
//! task is a subtask and participates in completion/deletion cascades.
//! `TaskDraft` is the caller-supplied shape for creation (the store assigns
//! id, creation timestamp and sort order); `TaskPatch` is a partial update
//! where `Some(None)` on a clearable field means "set to absent".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::{CategoryIcon, InsightKind, Priority};

/// A user-visible unit of work with completion, scheduling and priority
/// attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub ai_suggestions: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub sort_order: i64,
}

impl Task {
    /// True when the task is past its due date and still open.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|d| d < today)
    }
}

/// Caller-supplied fields for task creation. Excludes id, creation timestamp
/// and sort order, which the store assigns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub ai_suggestions: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Partial update for a task. Outer `None` leaves the field untouched;
/// for clearable fields, `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub parent_id: Option<Option<String>>,
    pub sort_order: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Merge the patch into an in-memory task.
    pub fn apply(&self, task: &mut Task) {
        if let Some(v) = &self.title {
            task.title = v.clone();
        }
        if let Some(v) = &self.description {
            task.description = v.clone();
        }
        if let Some(v) = self.completed {
            task.completed = v;
        }
        if let Some(v) = self.completed_at {
            task.completed_at = v;
        }
        if let Some(v) = self.due_date {
            task.due_date = v;
        }
        if let Some(v) = self.priority {
            task.priority = v;
        }
        if let Some(v) = &self.category {
            task.category = v.clone();
        }
        if let Some(v) = &self.tags {
            task.tags = v.clone();
        }
        if let Some(v) = &self.parent_id {
            task.parent_id = v.clone();
        }
        if let Some(v) = self.sort_order {
            task.sort_order = v;
        }
    }
}

/// A user-defined label with a colour and an icon from a fixed vocabulary.
/// Names are unique per user, case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: CategoryIcon,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for category creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: CategoryIcon,
}

/// A short session-local label. Tags live in memory only; the persisted
/// relation to tasks is the plain string list on `Task`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// A locally generated coaching insight. Session-lifetime only; never
/// written to or read from the persistence backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsight {
    pub id: String,
    pub kind: InsightKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub related_task_ids: Vec<String>,
}

impl AiInsight {
    pub fn new(kind: InsightKind, content: impl Into<String>, related: Vec<String>) -> Self {
        AiInsight {
            id: Uuid::new_v4().to_string(),
            kind,
            content: content.into(),
            created_at: Utc::now(),
            related_task_ids: related,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: "t1".into(),
            title: "Write report".into(),
            description: Some("quarterly".into()),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            due_date: NaiveDate::from_ymd_opt(2026, 8, 1),
            priority: Priority::High,
            category: Some("Work".into()),
            tags: vec!["writing".into()],
            ai_generated: false,
            ai_suggestions: Vec::new(),
            parent_id: None,
            sort_order: 3,
        }
    }

    #[test]
    fn patch_merges_and_clears() {
        let mut t = sample();
        let patch = TaskPatch {
            title: Some("Write Q3 report".into()),
            due_date: Some(None),
            category: Some(None),
            ..TaskPatch::default()
        };
        patch.apply(&mut t);
        assert_eq!(t.title, "Write Q3 report");
        assert_eq!(t.due_date, None);
        assert_eq!(t.category, None);
        // Untouched fields survive.
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.sort_order, 3);
    }

    #[test]
    fn overdue_requires_open_task() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        let mut t = sample();
        assert!(t.is_overdue(today));
        t.completed = true;
        assert!(!t.is_overdue(today));
        t.completed = false;
        t.due_date = None;
        assert!(!t.is_overdue(today));
    }
}
