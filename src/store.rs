//! The task store: the single authoritative place for reading and mutating
//! tasks and categories.
//!
//! The store owns the in-memory collections for the current session and
//! keeps them consistent with the persistence backend behind
//! [`StorageBackend`]. Mutations follow one contract: persist first (or
//! apply optimistically with a snapshot), commit to memory only on success,
//! and log-and-swallow backend failures — callers observe a failed
//! operation only as state that did not change. Validation failures
//! (duplicate category name, malformed colour) are typed errors so the
//! interaction layer can show a message.
//!
//! Unknown ids are silent no-ops throughout: the caller cannot distinguish
//! "already deleted elsewhere" from a bad id, so neither do we.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::fields::Filter;
use crate::storage::{BackendKind, StorageBackend};
use crate::summary::{self, TaskSummary};
use crate::task::{AiInsight, Category, CategoryDraft, Tag, Task, TaskDraft, TaskPatch};

/// Validation failures surfaced to the caller as distinguishable rejections.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a category named '{name}' already exists")]
    DuplicateCategoryName { name: String },

    #[error("'{value}' is not a 6-digit hex colour")]
    InvalidColor { value: String },
}

/// Partial update for a category; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<crate::fields::CategoryIcon>,
}

/// Authoritative session state plus its persistence backend.
///
/// Constructed explicitly and passed by reference to whichever interaction
/// layer needs it; there is no global instance.
pub struct TaskStore {
    user_id: String,
    backend: Box<dyn StorageBackend>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
}

impl TaskStore {
    pub fn new(backend: Box<dyn StorageBackend>, user_id: impl Into<String>) -> Self {
        TaskStore {
            user_id: user_id.into(),
            backend,
            tasks: Vec::new(),
            categories: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Load all tasks and categories for the current user, replacing the
    /// in-memory collections. On backend failure the prior state is left
    /// untouched — no partial overwrite.
    pub async fn fetch(&mut self) {
        match self.backend.list_tasks(&self.user_id).await {
            Ok(mut tasks) => {
                // Sort order ascending, most recently created first among ties.
                tasks.sort_by(|a, b| {
                    a.sort_order
                        .cmp(&b.sort_order)
                        .then(b.created_at.cmp(&a.created_at))
                });
                self.tasks = tasks;
            }
            Err(e) => {
                error!(backend = %self.backend.kind(), error = %e, "task fetch failed");
                return;
            }
        }
        match self.backend.list_categories(&self.user_id).await {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                error!(backend = %self.backend.kind(), error = %e, "category fetch failed");
            }
        }
    }

    /// Create a task from a draft. Assigns id, creation timestamp and a sort
    /// order one past the current maximum. A draft naming a parent with a
    /// category inherits that category regardless of what the draft said.
    ///
    /// Returns the committed task, or `None` when persistence failed and
    /// nothing changed. Title validation is the caller's job; an empty title
    /// is passed through untouched, never coerced.
    pub async fn add_task(&mut self, draft: TaskDraft) -> Option<Task> {
        let mut category = draft.category;
        if let Some(parent_id) = &draft.parent_id {
            if let Some(parent) = self.get(parent_id) {
                if parent.category.is_some() {
                    category = parent.category.clone();
                }
            }
        }

        let sort_order = self.tasks.iter().map(|t| t.sort_order).max().unwrap_or(0) + 1;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            due_date: draft.due_date,
            priority: draft.priority,
            category,
            tags: draft.tags,
            ai_generated: draft.ai_generated,
            ai_suggestions: draft.ai_suggestions,
            parent_id: draft.parent_id,
            sort_order,
        };

        if let Err(e) = self.backend.insert_task(&self.user_id, &task).await {
            error!(error = %e, title = %task.title, "task insert failed");
            return None;
        }
        self.tasks.insert(0, task.clone());
        debug!(id = %task.id, "task added");
        Some(task)
    }

    /// Apply a partial update to the addressed task. Unknown id or empty
    /// patch is a silent no-op. Returns whether the change was committed.
    pub async fn update_task(&mut self, id: &str, patch: TaskPatch) -> bool {
        if patch.is_empty() || self.get(id).is_none() {
            return false;
        }
        if let Err(e) = self.backend.update_task(&self.user_id, id, &patch).await {
            error!(error = %e, id, "task update failed");
            return false;
        }
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            patch.apply(task);
        }
        true
    }

    /// Delete the addressed task and, in the same logical operation, its
    /// direct subtasks. Unknown id is a silent no-op.
    pub async fn delete_task(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let mut doomed: Vec<String> = vec![id.to_string()];
        doomed.extend(
            self.tasks
                .iter()
                .filter(|t| t.parent_id.as_deref() == Some(id))
                .map(|t| t.id.clone()),
        );

        if let Err(e) = self.backend.delete_tasks(&self.user_id, &doomed).await {
            error!(error = %e, id, "task delete failed");
            return false;
        }
        self.tasks.retain(|t| !doomed.contains(&t.id));
        debug!(id, removed = doomed.len(), "task deleted");
        true
    }

    /// Flip the completed flag. Completing stamps `completed_at` and
    /// cascades the same timestamp to all direct subtasks; reopening clears
    /// the timestamp and leaves subtasks alone.
    pub async fn toggle_completion(&mut self, id: &str) -> bool {
        let Some(task) = self.get(id) else {
            return false;
        };

        let mut changed: Vec<Task> = Vec::new();
        if task.completed {
            let mut reopened = task.clone();
            reopened.completed = false;
            reopened.completed_at = None;
            changed.push(reopened);
        } else {
            let now = Utc::now();
            let mut done = task.clone();
            done.completed = true;
            done.completed_at = Some(now);
            changed.push(done);
            for sub in self.tasks.iter().filter(|t| t.parent_id.as_deref() == Some(id)) {
                let mut done = sub.clone();
                done.completed = true;
                done.completed_at = Some(now);
                changed.push(done);
            }
        }

        if let Err(e) = self.backend.upsert_tasks(&self.user_id, &changed).await {
            error!(error = %e, id, "completion toggle failed");
            return false;
        }
        for updated in changed {
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == updated.id) {
                *task = updated;
            }
        }
        true
    }

    /// Move the task at `from` to position `to` (single-element splice) and
    /// reassign every sort order to its dense 0-based position. The move is
    /// applied optimistically and rolled back if persistence fails.
    pub async fn reorder_tasks(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tasks.len() || to >= self.tasks.len() {
            return false;
        }
        let snapshot = self.tasks.clone();

        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        for (position, task) in self.tasks.iter_mut().enumerate() {
            task.sort_order = position as i64;
        }

        if let Err(e) = self.backend.upsert_tasks(&self.user_id, &self.tasks).await {
            error!(error = %e, from, to, "reorder persistence failed, rolling back");
            self.tasks = snapshot;
            return false;
        }
        true
    }

    fn name_taken(&self, name: &str, exclude_id: Option<&str>) -> bool {
        self.categories.iter().any(|c| {
            Some(c.id.as_str()) != exclude_id && c.name.eq_ignore_ascii_case(name)
        })
    }

    /// Create a category. Rejects case-insensitive duplicate names and
    /// malformed colours before touching the backend.
    pub async fn add_category(&mut self, draft: CategoryDraft) -> Result<Option<Category>, StoreError> {
        if !crate::fields::is_valid_hex_color(&draft.color) {
            return Err(StoreError::InvalidColor { value: draft.color });
        }
        if self.name_taken(&draft.name, None) {
            return Err(StoreError::DuplicateCategoryName { name: draft.name });
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            color: draft.color,
            icon: draft.icon,
            created_at: Utc::now(),
        };
        if let Err(e) = self.backend.insert_category(&self.user_id, &category).await {
            error!(error = %e, name = %category.name, "category insert failed");
            return Ok(None);
        }
        self.categories.push(category.clone());
        Ok(Some(category))
    }

    /// Update a category. Renames are checked against every other category,
    /// case-insensitively; renaming to the current name is allowed.
    pub async fn update_category(
        &mut self,
        id: &str,
        patch: CategoryPatch,
    ) -> Result<bool, StoreError> {
        let Some(existing) = self.categories.iter().find(|c| c.id == id) else {
            return Ok(false);
        };
        if let Some(color) = &patch.color {
            if !crate::fields::is_valid_hex_color(color) {
                return Err(StoreError::InvalidColor {
                    value: color.clone(),
                });
            }
        }
        if let Some(name) = &patch.name {
            if self.name_taken(name, Some(id)) {
                return Err(StoreError::DuplicateCategoryName { name: name.clone() });
            }
        }

        let mut updated = existing.clone();
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(color) = patch.color {
            updated.color = color;
        }
        if let Some(icon) = patch.icon {
            updated.icon = icon;
        }

        if let Err(e) = self.backend.update_category(&self.user_id, &updated).await {
            error!(error = %e, id, "category update failed");
            return Ok(false);
        }
        if let Some(slot) = self.categories.iter_mut().find(|c| c.id == id) {
            *slot = updated;
        }
        Ok(true)
    }

    /// Delete a category and clear its name from every task referencing it,
    /// as one logical operation. Tasks themselves are never deleted here.
    pub async fn delete_category(&mut self, id: &str) -> bool {
        let Some(category) = self.categories.iter().find(|c| c.id == id) else {
            return false;
        };
        let name = category.name.clone();

        let orphaned: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.category.as_deref() == Some(name.as_str()))
            .map(|t| {
                let mut t = t.clone();
                t.category = None;
                t
            })
            .collect();

        if let Err(e) = self.backend.upsert_tasks(&self.user_id, &orphaned).await {
            error!(error = %e, category = %name, "clearing category references failed");
            return false;
        }
        if let Err(e) = self.backend.delete_category(&self.user_id, id).await {
            error!(error = %e, category = %name, "category delete failed");
            // The references were already cleared remotely; put them back so
            // the backend matches the unchanged in-memory state.
            let originals: Vec<Task> = self
                .tasks
                .iter()
                .filter(|t| t.category.as_deref() == Some(name.as_str()))
                .cloned()
                .collect();
            if let Err(e) = self.backend.upsert_tasks(&self.user_id, &originals).await {
                error!(error = %e, category = %name, "restoring category references failed");
            }
            return false;
        }

        for task in self.tasks.iter_mut() {
            if task.category.as_deref() == Some(name.as_str()) {
                task.category = None;
            }
        }
        self.categories.retain(|c| c.id != id);
        true
    }

    /// Evaluate a filter against the in-memory collection.
    pub fn filtered_tasks(&self, filter: &Filter) -> Vec<&Task> {
        let due_query = filter.due_sentinel();
        let needle = filter.search.trim().to_lowercase();
        self.tasks
            .iter()
            .filter(|t| {
                if let Some(category) = &filter.category {
                    if t.category.as_deref() != Some(category.as_str()) {
                        return false;
                    }
                }
                if let Some(priority) = filter.priority {
                    if t.priority != priority {
                        return false;
                    }
                }
                if let Some(completed) = filter.completed {
                    if t.completed != completed {
                        return false;
                    }
                }
                if let Some(date) = due_query {
                    return t.due_date == Some(date);
                }
                if !needle.is_empty() {
                    let in_title = t.title.to_lowercase().contains(&needle);
                    let in_desc = t
                        .description
                        .as_ref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle));
                    return in_title || in_desc;
                }
                true
            })
            .collect()
    }

    /// Derive the read-only aggregate snapshot used by dashboards and the
    /// coach.
    pub fn summary(&self) -> TaskSummary {
        summary::derive(&self.tasks)
    }

    /// Locally generated coaching insights; session-lifetime only.
    pub fn insights(&self) -> Vec<AiInsight> {
        summary::generate_insights(&self.summary(), &self.tasks)
    }

    // Session-local tag list. Never persisted.

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn add_tag(&mut self, name: &str) -> Option<&Tag> {
        let name = name.trim();
        if name.is_empty() || self.tags.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
            return None;
        }
        self.tags.push(Tag::new(name));
        self.tags.last()
    }

    pub fn remove_tag(&mut self, id: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.id != id);
        if self.tags.len() == before {
            warn!(id, "tag not found");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CategoryIcon, Priority};
    use crate::storage::StorageError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory backend with failure switches, for exercising the
    /// persist-or-leave-unchanged contract. Fields are shared so a cloned
    /// handle can flip switches and inspect rows after the store takes
    /// ownership.
    #[derive(Default, Clone)]
    struct FakeBackend {
        fail: Arc<AtomicBool>,
        fail_category_delete: Arc<AtomicBool>,
        tasks: Arc<Mutex<Vec<Task>>>,
        categories: Arc<Mutex<Vec<Category>>>,
    }

    impl FakeBackend {
        fn check(&self) -> Result<(), StorageError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(StorageError::Backend {
                    status: 503,
                    detail: "injected failure".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl StorageBackend for FakeBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }

        async fn list_tasks(&self, _user: &str) -> Result<Vec<Task>, StorageError> {
            self.check()?;
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn insert_task(&self, _user: &str, task: &Task) -> Result<(), StorageError> {
            self.check()?;
            self.tasks.lock().unwrap().push(task.clone());
            Ok(())
        }

        async fn update_task(
            &self,
            _user: &str,
            id: &str,
            patch: &TaskPatch,
        ) -> Result<(), StorageError> {
            self.check()?;
            if let Some(t) = self.tasks.lock().unwrap().iter_mut().find(|t| t.id == id) {
                patch.apply(t);
            }
            Ok(())
        }

        async fn delete_tasks(&self, _user: &str, ids: &[String]) -> Result<(), StorageError> {
            self.check()?;
            self.tasks.lock().unwrap().retain(|t| !ids.contains(&t.id));
            Ok(())
        }

        async fn upsert_tasks(&self, _user: &str, tasks: &[Task]) -> Result<(), StorageError> {
            self.check()?;
            let mut stored = self.tasks.lock().unwrap();
            for task in tasks {
                match stored.iter_mut().find(|t| t.id == task.id) {
                    Some(slot) => *slot = task.clone(),
                    None => stored.push(task.clone()),
                }
            }
            Ok(())
        }

        async fn list_categories(&self, _user: &str) -> Result<Vec<Category>, StorageError> {
            self.check()?;
            Ok(self.categories.lock().unwrap().clone())
        }

        async fn insert_category(&self, _user: &str, c: &Category) -> Result<(), StorageError> {
            self.check()?;
            self.categories.lock().unwrap().push(c.clone());
            Ok(())
        }

        async fn update_category(&self, _user: &str, c: &Category) -> Result<(), StorageError> {
            self.check()?;
            if let Some(slot) = self
                .categories
                .lock()
                .unwrap()
                .iter_mut()
                .find(|x| x.id == c.id)
            {
                *slot = c.clone();
            }
            Ok(())
        }

        async fn delete_category(&self, _user: &str, id: &str) -> Result<(), StorageError> {
            self.check()?;
            if self.fail_category_delete.load(Ordering::SeqCst) {
                return Err(StorageError::Backend {
                    status: 503,
                    detail: "injected failure".into(),
                });
            }
            self.categories.lock().unwrap().retain(|c| c.id != id);
            Ok(())
        }
    }

    fn store() -> TaskStore {
        TaskStore::new(Box::new(FakeBackend::default()), "u1")
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            ..TaskDraft::default()
        }
    }

    async fn store_with_titles(titles: &[&str]) -> (TaskStore, Vec<String>) {
        let mut s = store();
        let mut ids = Vec::new();
        for t in titles {
            ids.push(s.add_task(draft(t)).await.unwrap().id);
        }
        (s, ids)
    }

    #[tokio::test]
    async fn add_assigns_incrementing_sort_order() {
        let (s, ids) = store_with_titles(&["one", "two", "three"]).await;
        assert_eq!(s.get(&ids[0]).unwrap().sort_order, 1);
        assert_eq!(s.get(&ids[2]).unwrap().sort_order, 3);
        // Newest first in memory.
        assert_eq!(s.tasks()[0].title, "three");
    }

    #[tokio::test]
    async fn add_failure_leaves_state_unchanged() {
        let mut s = store();
        s.add_task(draft("kept")).await.unwrap();

        let backend = FakeBackend::default();
        backend.fail.store(true, Ordering::SeqCst);
        let mut failing = TaskStore::new(Box::new(backend), "u1");
        assert!(failing.add_task(draft("lost")).await.is_none());
        assert!(failing.tasks().is_empty());
        assert_eq!(s.tasks().len(), 1);
    }

    #[tokio::test]
    async fn toggle_twice_is_identity() {
        let (mut s, ids) = store_with_titles(&["t"]).await;
        let before = s.get(&ids[0]).unwrap().clone();

        assert!(s.toggle_completion(&ids[0]).await);
        let mid = s.get(&ids[0]).unwrap();
        assert!(mid.completed);
        assert!(mid.completed_at.is_some());

        assert!(s.toggle_completion(&ids[0]).await);
        let after = s.get(&ids[0]).unwrap();
        assert_eq!(after.completed, before.completed);
        assert_eq!(after.completed_at, before.completed_at);
    }

    #[tokio::test]
    async fn completing_parent_cascades_down_not_up() {
        let (mut s, ids) = store_with_titles(&["parent"]).await;
        let parent_id = ids[0].clone();
        let sub_a = s
            .add_task(TaskDraft {
                parent_id: Some(parent_id.clone()),
                ..draft("sub a")
            })
            .await
            .unwrap()
            .id;
        let sub_b = s
            .add_task(TaskDraft {
                parent_id: Some(parent_id.clone()),
                ..draft("sub b")
            })
            .await
            .unwrap()
            .id;

        s.toggle_completion(&parent_id).await;
        let parent_at = s.get(&parent_id).unwrap().completed_at;
        for sub in [&sub_a, &sub_b] {
            let sub = s.get(sub).unwrap();
            assert!(sub.completed);
            assert_eq!(sub.completed_at, parent_at);
        }

        // Reopen the parent, then complete both subtasks: the parent must
        // stay open.
        s.toggle_completion(&parent_id).await;
        s.toggle_completion(&sub_a).await; // reopen sub a
        s.toggle_completion(&sub_a).await;
        s.toggle_completion(&sub_b).await;
        s.toggle_completion(&sub_b).await;
        assert!(!s.get(&parent_id).unwrap().completed);
    }

    #[tokio::test]
    async fn delete_cascades_one_level_only() {
        let (mut s, ids) = store_with_titles(&["parent", "bystander"]).await;
        let parent_id = ids[0].clone();
        let sub = s
            .add_task(TaskDraft {
                parent_id: Some(parent_id.clone()),
                ..draft("sub")
            })
            .await
            .unwrap()
            .id;

        assert!(s.delete_task(&parent_id).await);
        assert!(s.get(&parent_id).is_none());
        assert!(s.get(&sub).is_none());
        assert_eq!(s.tasks().len(), 1);
        assert_eq!(s.tasks()[0].title, "bystander");

        // Unknown id is a silent no-op.
        assert!(!s.delete_task("ghost").await);
        assert_eq!(s.tasks().len(), 1);
    }

    #[tokio::test]
    async fn subtask_inherits_parent_category() {
        let mut s = store();
        s.add_category(CategoryDraft {
            name: "Work".into(),
            color: "#112233".into(),
            icon: CategoryIcon::Briefcase,
        })
        .await
        .unwrap();
        let parent = s
            .add_task(TaskDraft {
                category: Some("Work".into()),
                ..draft("parent")
            })
            .await
            .unwrap();

        let sub = s
            .add_task(TaskDraft {
                parent_id: Some(parent.id.clone()),
                category: Some("Home".into()),
                ..draft("sub")
            })
            .await
            .unwrap();
        assert_eq!(sub.category.as_deref(), Some("Work"));

        // Parent without a category leaves the draft's choice alone.
        let bare = s.add_task(draft("bare parent")).await.unwrap();
        let sub2 = s
            .add_task(TaskDraft {
                parent_id: Some(bare.id),
                category: Some("Home".into()),
                ..draft("sub2")
            })
            .await
            .unwrap();
        assert_eq!(sub2.category.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn reorder_splices_and_densifies() {
        // In-memory order is newest-first, so create D,C,B,A to get [A,B,C,D].
        let (mut s, _) = store_with_titles(&["D", "C", "B", "A"]).await;
        let names: Vec<_> = s.tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(names, ["A", "B", "C", "D"]);

        assert!(s.reorder_tasks(0, 2).await);
        let names: Vec<_> = s.tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(names, ["B", "C", "A", "D"]);
        let orders: Vec<_> = s.tasks().iter().map(|t| t.sort_order).collect();
        assert_eq!(orders, [0, 1, 2, 3]);

        // Out of range is a no-op.
        assert!(!s.reorder_tasks(0, 9).await);
    }

    #[tokio::test]
    async fn reorder_rolls_back_on_failure() {
        let backend = Box::new(FakeBackend::default());
        let mut s = TaskStore::new(backend, "u1");
        for t in ["D", "C", "B", "A"] {
            s.add_task(draft(t)).await.unwrap();
        }
        let before: Vec<_> = s.tasks().to_vec();

        // Rebuild the same state on a backend whose writes fail.
        let failing = FakeBackend::default();
        failing.fail.store(true, Ordering::SeqCst);
        let mut s2 = TaskStore::new(Box::new(failing), "u1");
        s2.tasks = before.clone();

        assert!(!s2.reorder_tasks(0, 2).await);
        assert_eq!(s2.tasks(), before.as_slice());
    }

    #[tokio::test]
    async fn duplicate_category_names_rejected_case_insensitively() {
        let mut s = store();
        s.add_category(CategoryDraft {
            name: "Work".into(),
            color: "#112233".into(),
            icon: CategoryIcon::Briefcase,
        })
        .await
        .unwrap();

        let err = s
            .add_category(CategoryDraft {
                name: "WORK".into(),
                color: "#445566".into(),
                icon: CategoryIcon::Folder,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateCategoryName {
                name: "WORK".into()
            }
        );
        assert_eq!(s.categories().len(), 1);
    }

    #[tokio::test]
    async fn rename_checks_others_but_allows_self() {
        let mut s = store();
        let work = s
            .add_category(CategoryDraft {
                name: "Work".into(),
                color: "#112233".into(),
                icon: CategoryIcon::Briefcase,
            })
            .await
            .unwrap()
            .unwrap();
        s.add_category(CategoryDraft {
            name: "Home".into(),
            color: "#445566".into(),
            icon: CategoryIcon::Home,
        })
        .await
        .unwrap();

        // Rename-to-self (case change) is allowed.
        assert!(s
            .update_category(
                &work.id,
                CategoryPatch {
                    name: Some("work".into()),
                    ..CategoryPatch::default()
                }
            )
            .await
            .unwrap());

        // Colliding with another category is not.
        let err = s
            .update_category(
                &work.id,
                CategoryPatch {
                    name: Some("home".into()),
                    ..CategoryPatch::default()
                }
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCategoryName { .. }));
    }

    #[tokio::test]
    async fn invalid_color_rejected() {
        let mut s = store();
        let err = s
            .add_category(CategoryDraft {
                name: "Neon".into(),
                color: "bright green".into(),
                icon: CategoryIcon::Star,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidColor { .. }));
        assert!(s.categories().is_empty());
    }

    #[tokio::test]
    async fn deleting_category_clears_references_only() {
        let mut s = store();
        let work = s
            .add_category(CategoryDraft {
                name: "Work".into(),
                color: "#112233".into(),
                icon: CategoryIcon::Briefcase,
            })
            .await
            .unwrap()
            .unwrap();
        let in_work = s
            .add_task(TaskDraft {
                category: Some("Work".into()),
                ..draft("report")
            })
            .await
            .unwrap()
            .id;
        let elsewhere = s
            .add_task(TaskDraft {
                category: Some("Home".into()),
                ..draft("laundry")
            })
            .await
            .unwrap()
            .id;

        assert!(s.delete_category(&work.id).await);
        assert_eq!(s.get(&in_work).unwrap().category, None);
        assert_eq!(s.get(&elsewhere).unwrap().category.as_deref(), Some("Home"));
        assert_eq!(s.tasks().len(), 2);
        assert!(s.categories().is_empty());
    }

    #[tokio::test]
    async fn failed_category_delete_restores_references() {
        let backend = FakeBackend::default();
        let handle = backend.clone();
        let mut s = TaskStore::new(Box::new(backend), "u1");
        let work = s
            .add_category(CategoryDraft {
                name: "Work".into(),
                color: "#112233".into(),
                icon: CategoryIcon::Briefcase,
            })
            .await
            .unwrap()
            .unwrap();
        let id = s
            .add_task(TaskDraft {
                category: Some("Work".into()),
                ..draft("report")
            })
            .await
            .unwrap()
            .id;

        handle.fail_category_delete.store(true, Ordering::SeqCst);
        assert!(!s.delete_category(&work.id).await);

        // Memory unchanged.
        assert_eq!(s.get(&id).unwrap().category.as_deref(), Some("Work"));
        assert_eq!(s.categories().len(), 1);
        // The compensating upsert put the backend reference back too.
        let rows = handle.tasks.lock().unwrap();
        assert_eq!(rows[0].category.as_deref(), Some("Work"));
        assert_eq!(handle.categories.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_unknown_id_is_silent_noop() {
        let mut s = store();
        let committed = s
            .update_task(
                "ghost",
                TaskPatch {
                    title: Some("renamed".into()),
                    ..TaskPatch::default()
                },
            )
            .await;
        assert!(!committed);
    }

    #[tokio::test]
    async fn filters_combine() {
        let mut s = store();
        s.add_task(TaskDraft {
            category: Some("Work".into()),
            priority: Priority::Urgent,
            ..draft("Ship the release")
        })
        .await
        .unwrap();
        s.add_task(TaskDraft {
            category: Some("Home".into()),
            due_date: chrono::NaiveDate::from_ymd_opt(2026, 9, 1),
            ..draft("Buy groceries")
        })
        .await
        .unwrap();

        let by_category = s.filtered_tasks(&Filter {
            category: Some("Work".into()),
            ..Filter::default()
        });
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].title, "Ship the release");

        let by_search = s.filtered_tasks(&Filter {
            search: "groceries".into(),
            ..Filter::default()
        });
        assert_eq!(by_search.len(), 1);

        let by_due = s.filtered_tasks(&Filter {
            search: "due:2026-09-01".into(),
            ..Filter::default()
        });
        assert_eq!(by_due.len(), 1);
        assert_eq!(by_due[0].title, "Buy groceries");
    }

    #[tokio::test]
    async fn fetch_failure_preserves_prior_state() {
        let (mut s, _) = store_with_titles(&["kept"]).await;
        // fetch against the healthy backend keeps the task
        s.fetch().await;
        assert_eq!(s.tasks().len(), 1);

        let failing = FakeBackend::default();
        failing.fail.store(true, Ordering::SeqCst);
        let mut s2 = TaskStore::new(Box::new(failing), "u1");
        s2.tasks = s.tasks().to_vec();
        s2.fetch().await;
        assert_eq!(s2.tasks().len(), 1, "failed fetch must not clear state");
    }

    #[tokio::test]
    async fn session_tags_are_in_memory_only() {
        let mut s = store();
        let id = s.add_tag("errands").unwrap().id.clone();
        assert!(s.add_tag("Errands").is_none(), "case-insensitive dedupe");
        assert!(s.remove_tag(&id));
        assert!(!s.remove_tag(&id));
        assert!(s.tags().is_empty());
    }
}
