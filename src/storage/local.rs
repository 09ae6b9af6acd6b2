//! Local JSON-file fallback backend.
//!
//! The system of record when the remote store is not configured. The whole
//! document (task array + category array) is replaced wholesale on every
//! mutating operation, written atomically via temp file + rename. A missing
//! or unparseable file yields an empty store rather than an error.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::{BackendKind, StorageBackend, StorageError};
use crate::task::{Category, Task, TaskPatch};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    tasks: Vec<Task>,
    #[serde(default)]
    categories: Vec<Category>,
}

/// File-backed storage. Single-device, single-user: the owner id is
/// accepted for interface parity but not recorded in the file.
pub struct LocalStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl LocalStore {
    /// Open the store at `path`, loading any existing document.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = Self::load(&path);
        LocalStore {
            path,
            doc: Mutex::new(doc),
        }
    }

    fn load(path: &Path) -> Document {
        if !path.exists() {
            return Document::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable task file, starting empty");
                    Document::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read task file, starting empty");
                Document::default()
            }
        }
    }

    /// Persist the full document via temp + rename.
    fn save(&self, doc: &Document) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(doc)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn list_tasks(&self, _user_id: &str) -> Result<Vec<Task>, StorageError> {
        let doc = self.doc.lock().expect("local store lock");
        Ok(doc.tasks.clone())
    }

    async fn insert_task(&self, _user_id: &str, task: &Task) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().expect("local store lock");
        doc.tasks.push(task.clone());
        self.save(&doc)
    }

    async fn update_task(
        &self,
        _user_id: &str,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().expect("local store lock");
        if let Some(task) = doc.tasks.iter_mut().find(|t| t.id == id) {
            patch.apply(task);
            self.save(&doc)?;
        }
        Ok(())
    }

    async fn delete_tasks(&self, _user_id: &str, ids: &[String]) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().expect("local store lock");
        doc.tasks.retain(|t| !ids.contains(&t.id));
        self.save(&doc)
    }

    async fn upsert_tasks(&self, _user_id: &str, tasks: &[Task]) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().expect("local store lock");
        for task in tasks {
            match doc.tasks.iter_mut().find(|t| t.id == task.id) {
                Some(existing) => *existing = task.clone(),
                None => doc.tasks.push(task.clone()),
            }
        }
        self.save(&doc)
    }

    async fn list_categories(&self, _user_id: &str) -> Result<Vec<Category>, StorageError> {
        let doc = self.doc.lock().expect("local store lock");
        Ok(doc.categories.clone())
    }

    async fn insert_category(
        &self,
        _user_id: &str,
        category: &Category,
    ) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().expect("local store lock");
        doc.categories.push(category.clone());
        self.save(&doc)
    }

    async fn update_category(
        &self,
        _user_id: &str,
        category: &Category,
    ) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().expect("local store lock");
        if let Some(existing) = doc.categories.iter_mut().find(|c| c.id == category.id) {
            *existing = category.clone();
            self.save(&doc)?;
        }
        Ok(())
    }

    async fn delete_category(&self, _user_id: &str, id: &str) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().expect("local store lock");
        doc.categories.retain(|c| c.id != id);
        self.save(&doc)
    }
}
