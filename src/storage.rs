//! Storage-capability interface over the persistence backend.
//!
//! The task store talks to exactly one implementation of
//! [`StorageBackend`], chosen once at startup: the remote relational store
//! when configured, otherwise the local JSON file. Store logic never
//! branches on the backend kind.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::task::{Category, Task, TaskPatch};

pub mod local;
pub mod remote;

/// Which backend a store is running against. Display form is used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Remote => write!(f, "remote"),
        }
    }
}

/// Errors surfaced by a persistence backend.
///
/// The store catches and logs these; they never propagate to interaction
/// layers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend rejected request (HTTP {status}): {detail}")]
    Backend { status: u16, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Row-level persistence operations, keyed by the owning user.
///
/// Batch task deletion exists so a parent and its subtasks go in one
/// logical operation; batch upsert backs the reorder path.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StorageError>;
    async fn insert_task(&self, user_id: &str, task: &Task) -> Result<(), StorageError>;
    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<(), StorageError>;
    async fn delete_tasks(&self, user_id: &str, ids: &[String]) -> Result<(), StorageError>;
    async fn upsert_tasks(&self, user_id: &str, tasks: &[Task]) -> Result<(), StorageError>;

    async fn list_categories(&self, user_id: &str) -> Result<Vec<Category>, StorageError>;
    async fn insert_category(
        &self,
        user_id: &str,
        category: &Category,
    ) -> Result<(), StorageError>;
    async fn update_category(
        &self,
        user_id: &str,
        category: &Category,
    ) -> Result<(), StorageError>;
    async fn delete_category(&self, user_id: &str, id: &str) -> Result<(), StorageError>;
}
