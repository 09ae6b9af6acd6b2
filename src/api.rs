//! HTTP surface: the chat endpoint plus a JSON task/category API.
//!
//! Shared state is the task store behind an async mutex; operations
//! serialize through it. Backend failures never surface as panics — the
//! store swallows them — but a mutation that did not commit is reported as
//! 502 so API clients are not left guessing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::coach::Coach;
use crate::fields::Filter;
use crate::mapper;
use crate::store::{CategoryPatch, StoreError, TaskStore};
use crate::task::{CategoryDraft, Task, TaskDraft};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<TaskStore>>,
    pub coach: Arc<Coach>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            axum::routing::patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/toggle", post(toggle_task))
        .route("/api/tasks/reorder", post(reorder_tasks))
        .route("/api/summary", get(get_summary))
        .route("/api/insights", get(get_insights))
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            axum::routing::patch(update_category).delete(delete_category),
        )
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/{id}", axum::routing::delete(delete_tag))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}

fn error_body(status: StatusCode, error: &str, detail: &str) -> Response {
    (status, Json(json!({ "error": error, "detail": detail }))).into_response()
}

// ---- chat ----

#[derive(Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
    fallback: bool,
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let message = req.message.unwrap_or_default();
    if message.trim().is_empty() {
        return error_body(
            StatusCode::BAD_REQUEST,
            "message is required",
            "send a non-empty 'message' field",
        );
    }

    // Snapshot under the lock, answer outside it: the remote coach path can
    // take tens of seconds and must not block task mutations.
    let (summary, categories) = {
        let store = state.store.lock().await;
        (store.summary(), store.categories().to_vec())
    };
    let reply = state.coach.respond(&summary, &categories, &message).await;

    let mut created = None;
    if let Some(draft) = reply.task {
        if !draft.title.trim().is_empty() {
            created = state.store.lock().await.add_task(draft).await;
        }
    }

    Json(ChatResponse {
        message: reply.message,
        task: created,
        fallback: reply.fallback,
    })
    .into_response()
}

// ---- tasks ----

async fn list_tasks(State(state): State<AppState>, Query(filter): Query<Filter>) -> Response {
    let store = state.store.lock().await;
    let tasks: Vec<Task> = store
        .filtered_tasks(&filter)
        .into_iter()
        .cloned()
        .collect();
    Json(tasks).into_response()
}

async fn create_task(State(state): State<AppState>, Json(draft): Json<TaskDraft>) -> Response {
    if draft.title.trim().is_empty() {
        return error_body(
            StatusCode::BAD_REQUEST,
            "title is required",
            "task titles may not be empty",
        );
    }
    match state.store.lock().await.add_task(draft).await {
        Some(task) => (StatusCode::CREATED, Json(task)).into_response(),
        None => error_body(
            StatusCode::BAD_GATEWAY,
            "task was not saved",
            "the persistence backend rejected the operation",
        ),
    }
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let patch = match mapper::patch_from_row(&body) {
        Ok(patch) => patch,
        Err(detail) => {
            return error_body(StatusCode::BAD_REQUEST, "invalid patch", &detail);
        }
    };
    let mut store = state.store.lock().await;
    if store.update_task(&id, patch).await {
        match store.get(&id) {
            Some(task) => Json(task.clone()).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        }
    } else {
        // Unknown id or nothing committed: silent no-op by contract.
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.store.lock().await.delete_task(&id).await;
    StatusCode::NO_CONTENT.into_response()
}

async fn toggle_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.store.lock().await;
    if store.toggle_completion(&id).await {
        match store.get(&id) {
            Some(task) => Json(task.clone()).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        }
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[derive(Deserialize)]
struct ReorderRequest {
    from: usize,
    to: usize,
}

async fn reorder_tasks(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Response {
    let mut store = state.store.lock().await;
    let len = store.tasks().len();
    if req.from >= len || req.to >= len {
        return error_body(
            StatusCode::BAD_REQUEST,
            "position out of range",
            &format!("indices must be below {len}"),
        );
    }
    if store.reorder_tasks(req.from, req.to).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_body(
            StatusCode::BAD_GATEWAY,
            "reorder was not saved",
            "the persistence backend rejected the operation; order unchanged",
        )
    }
}

// ---- summary / insights ----

async fn get_summary(State(state): State<AppState>) -> Response {
    Json(state.store.lock().await.summary()).into_response()
}

async fn get_insights(State(state): State<AppState>) -> Response {
    Json(state.store.lock().await.insights()).into_response()
}

// ---- categories ----

async fn list_categories(State(state): State<AppState>) -> Response {
    Json(state.store.lock().await.categories().to_vec()).into_response()
}

async fn create_category(
    State(state): State<AppState>,
    Json(draft): Json<CategoryDraft>,
) -> Response {
    if draft.name.trim().is_empty() {
        return error_body(
            StatusCode::BAD_REQUEST,
            "name is required",
            "category names may not be empty",
        );
    }
    match state.store.lock().await.add_category(draft).await {
        Ok(Some(category)) => (StatusCode::CREATED, Json(category)).into_response(),
        Ok(None) => error_body(
            StatusCode::BAD_GATEWAY,
            "category was not saved",
            "the persistence backend rejected the operation",
        ),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryUpdateRequest {
    name: Option<String>,
    color: Option<String>,
    icon: Option<crate::fields::CategoryIcon>,
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CategoryUpdateRequest>,
) -> Response {
    let patch = CategoryPatch {
        name: req.name,
        color: req.color,
        icon: req.icon,
    };
    let mut store = state.store.lock().await;
    match store.update_category(&id, patch).await {
        Ok(true) => {
            let updated = store.categories().iter().find(|c| c.id == id).cloned();
            match updated {
                Some(category) => Json(category).into_response(),
                None => StatusCode::NO_CONTENT.into_response(),
            }
        }
        Ok(false) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn delete_category(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.store.lock().await.delete_category(&id).await;
    StatusCode::NO_CONTENT.into_response()
}

fn store_error_response(e: StoreError) -> Response {
    let status = match e {
        StoreError::DuplicateCategoryName { .. } => StatusCode::CONFLICT,
        StoreError::InvalidColor { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_body(status, &e.to_string(), "fix the request and retry")
}

// ---- tags ----

#[derive(Deserialize)]
struct TagRequest {
    name: String,
}

async fn list_tags(State(state): State<AppState>) -> Response {
    Json(state.store.lock().await.tags().to_vec()).into_response()
}

async fn create_tag(State(state): State<AppState>, Json(req): Json<TagRequest>) -> Response {
    let mut store = state.store.lock().await;
    match store.add_tag(&req.name) {
        Some(tag) => (StatusCode::CREATED, Json(tag.clone())).into_response(),
        None => error_body(
            StatusCode::CONFLICT,
            "tag not added",
            "empty or duplicate tag name",
        ),
    }
}

async fn delete_tag(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.store.lock().await.remove_tag(&id);
    StatusCode::NO_CONTENT.into_response()
}
