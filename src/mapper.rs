//! Entity mapping between in-memory shapes and backend row shapes.
//!
//! The persistence backend speaks snake_case rows with `null` for absent
//! optional fields; the application speaks the structs in [`crate::task`].
//! Everything here is pure and deterministic: no validation, no side
//! effects, round-trip safe.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::{CategoryIcon, Priority};
use crate::task::{Category, Task, TaskPatch};

/// Wire shape of a task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ai_generated: Option<bool>,
    pub ai_suggestions: Option<Vec<String>>,
    pub parent_id: Option<String>,
    pub sort_order: i64,
    pub user_id: String,
}

/// Wire shape of a category row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: CategoryIcon,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

/// Map a task to its row shape, stamping the owning user.
/// Empty collections go out as `null`.
pub fn task_to_row(task: &Task, user_id: &str) -> TaskRow {
    TaskRow {
        id: task.id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        completed: task.completed,
        created_at: task.created_at,
        completed_at: task.completed_at,
        due_date: task.due_date,
        priority: task.priority,
        category: task.category.clone(),
        tags: if task.tags.is_empty() {
            None
        } else {
            Some(task.tags.clone())
        },
        ai_generated: if task.ai_generated { Some(true) } else { None },
        ai_suggestions: if task.ai_suggestions.is_empty() {
            None
        } else {
            Some(task.ai_suggestions.clone())
        },
        parent_id: task.parent_id.clone(),
        sort_order: task.sort_order,
        user_id: user_id.to_string(),
    }
}

/// Map a row back to the in-memory task shape, null-coalescing optional
/// collections.
pub fn task_from_row(row: TaskRow) -> Task {
    Task {
        id: row.id,
        title: row.title,
        description: row.description,
        completed: row.completed,
        created_at: row.created_at,
        completed_at: row.completed_at,
        due_date: row.due_date,
        priority: row.priority,
        category: row.category,
        tags: row.tags.unwrap_or_default(),
        ai_generated: row.ai_generated.unwrap_or(false),
        ai_suggestions: row.ai_suggestions.unwrap_or_default(),
        parent_id: row.parent_id,
        sort_order: row.sort_order,
    }
}

pub fn category_to_row(category: &Category, user_id: &str) -> CategoryRow {
    CategoryRow {
        id: category.id.clone(),
        name: category.name.clone(),
        color: category.color.clone(),
        icon: category.icon,
        created_at: category.created_at,
        user_id: user_id.to_string(),
    }
}

pub fn category_from_row(row: CategoryRow) -> Category {
    Category {
        id: row.id,
        name: row.name,
        color: row.color,
        icon: row.icon,
        created_at: row.created_at,
    }
}

/// Render a partial update as a JSON object for an update-by-id call.
///
/// Only touched fields appear; cleared fields appear with an explicit
/// `null` so the backend distinguishes "clear" from "leave alone".
pub fn patch_to_row(patch: &TaskPatch) -> Map<String, Value> {
    fn val<T: Serialize>(v: &T) -> Value {
        serde_json::to_value(v).unwrap_or(Value::Null)
    }

    let mut row = Map::new();
    if let Some(v) = &patch.title {
        row.insert("title".into(), val(v));
    }
    if let Some(v) = &patch.description {
        row.insert("description".into(), val(v));
    }
    if let Some(v) = patch.completed {
        row.insert("completed".into(), val(&v));
    }
    if let Some(v) = &patch.completed_at {
        row.insert("completed_at".into(), val(v));
    }
    if let Some(v) = &patch.due_date {
        row.insert("due_date".into(), val(v));
    }
    if let Some(v) = patch.priority {
        row.insert("priority".into(), val(&v));
    }
    if let Some(v) = &patch.category {
        row.insert("category".into(), val(v));
    }
    if let Some(v) = &patch.tags {
        row.insert(
            "tags".into(),
            if v.is_empty() { Value::Null } else { val(v) },
        );
    }
    if let Some(v) = &patch.parent_id {
        row.insert("parent_id".into(), val(v));
    }
    if let Some(v) = patch.sort_order {
        row.insert("sort_order".into(), val(&v));
    }
    row
}

/// Parse a JSON object into a partial update. Accepts snake_case row keys
/// and their camelCase entity spellings; a `null` on a clearable field
/// means "clear", absence means "leave alone". Unknown keys are rejected
/// so callers can report a client error instead of silently dropping a
/// misspelled field.
pub fn patch_from_row(row: &Map<String, Value>) -> Result<TaskPatch, String> {
    fn parse<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> Result<T, String> {
        serde_json::from_value(value.clone()).map_err(|e| format!("invalid value for {key}: {e}"))
    }

    let mut patch = TaskPatch::default();
    for (key, value) in row {
        match key.as_str() {
            "title" => patch.title = Some(parse(key, value)?),
            "description" => patch.description = Some(parse(key, value)?),
            "completed" => patch.completed = Some(parse(key, value)?),
            "completed_at" | "completedAt" => patch.completed_at = Some(parse(key, value)?),
            "due_date" | "dueDate" => patch.due_date = Some(parse(key, value)?),
            "priority" => patch.priority = Some(parse(key, value)?),
            "category" => patch.category = Some(parse(key, value)?),
            "tags" => patch.tags = Some(parse(key, value)?),
            "parent_id" | "parentId" => patch.parent_id = Some(parse(key, value)?),
            "sort_order" | "sortOrder" => patch.sort_order = Some(parse(key, value)?),
            other => return Err(format!("unknown field '{other}'")),
        }
    }
    Ok(patch)
}
