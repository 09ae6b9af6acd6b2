//! Remote relational backend over a PostgREST-style HTTP API.
//!
//! Rows are addressed per-record by the owning user id; filters and
//! ordering travel in the query string. The API key goes out both as an
//! `apikey` header and a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::mapper;
use crate::storage::{BackendKind, StorageBackend, StorageError};
use crate::task::{Category, Task, TaskPatch};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the hosted persistence backend.
pub struct RemoteStore {
    base_url: String,
    api_key: String,
    http: Client,
}

impl RemoteStore {
    /// Create a client for the backend at `base_url` using `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("taskcoach/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(RemoteStore {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }

    fn endpoint(&self, table: &str, query: &str) -> String {
        format!("{}/rest/v1/{table}?{query}", self.base_url)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Map a non-success response to a backend error.
    async fn check(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        Err(StorageError::Backend {
            status: status.as_u16(),
            detail: if detail.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown")
                    .to_string()
            } else {
                detail
            },
        })
    }
}

#[async_trait]
impl StorageBackend for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StorageError> {
        let url = self.endpoint(
            "tasks",
            &format!("user_id=eq.{user_id}&order=sort_order.asc,created_at.desc"),
        );
        debug!(%url, "listing tasks");
        let response = Self::check(self.authed(self.http.get(url)).send().await?).await?;
        let rows: Vec<mapper::TaskRow> = response.json().await?;
        Ok(rows.into_iter().map(mapper::task_from_row).collect())
    }

    async fn insert_task(&self, user_id: &str, task: &Task) -> Result<(), StorageError> {
        let url = self.endpoint("tasks", "");
        let row = mapper::task_to_row(task, user_id);
        Self::check(self.authed(self.http.post(url)).json(&[row]).send().await?).await?;
        Ok(())
    }

    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<(), StorageError> {
        let url = self.endpoint("tasks", &format!("id=eq.{id}&user_id=eq.{user_id}"));
        let body = mapper::patch_to_row(patch);
        Self::check(self.authed(self.http.patch(url)).json(&body).send().await?).await?;
        Ok(())
    }

    async fn delete_tasks(&self, user_id: &str, ids: &[String]) -> Result<(), StorageError> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = self.endpoint(
            "tasks",
            &format!("id=in.({})&user_id=eq.{user_id}", ids.join(",")),
        );
        Self::check(self.authed(self.http.delete(url)).send().await?).await?;
        Ok(())
    }

    async fn upsert_tasks(&self, user_id: &str, tasks: &[Task]) -> Result<(), StorageError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let url = self.endpoint("tasks", "on_conflict=id");
        let rows: Vec<_> = tasks
            .iter()
            .map(|t| mapper::task_to_row(t, user_id))
            .collect();
        Self::check(
            self.authed(self.http.post(url))
                .header("Prefer", "resolution=merge-duplicates")
                .json(&rows)
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    async fn list_categories(&self, user_id: &str) -> Result<Vec<Category>, StorageError> {
        let url = self.endpoint("categories", &format!("user_id=eq.{user_id}&order=name.asc"));
        let response = Self::check(self.authed(self.http.get(url)).send().await?).await?;
        let rows: Vec<mapper::CategoryRow> = response.json().await?;
        Ok(rows.into_iter().map(mapper::category_from_row).collect())
    }

    async fn insert_category(
        &self,
        user_id: &str,
        category: &Category,
    ) -> Result<(), StorageError> {
        let url = self.endpoint("categories", "");
        let row = mapper::category_to_row(category, user_id);
        Self::check(self.authed(self.http.post(url)).json(&[row]).send().await?).await?;
        Ok(())
    }

    async fn update_category(
        &self,
        user_id: &str,
        category: &Category,
    ) -> Result<(), StorageError> {
        let url = self.endpoint(
            "categories",
            &format!("id=eq.{}&user_id=eq.{user_id}", category.id),
        );
        let row = mapper::category_to_row(category, user_id);
        Self::check(self.authed(self.http.patch(url)).json(&row).send().await?).await?;
        Ok(())
    }

    async fn delete_category(&self, user_id: &str, id: &str) -> Result<(), StorageError> {
        let url = self.endpoint("categories", &format!("id=eq.{id}&user_id=eq.{user_id}"));
        Self::check(self.authed(self.http.delete(url)).send().await?).await?;
        Ok(())
    }
}
