//! Task endpoints: list (filter/search/sort plus statistics), create,
//! get, update, toggle-complete, delete.
//!
//! The current user arrives as a request extension installed by the
//! auth middleware and is threaded through explicitly. Every operation
//! re-checks ownership before touching a row — a foreign task is
//! indistinguishable from a missing one.

use crate::auth::SharedState;
use crate::forms::{TaskForm, ValidationErrors};
use crate::model::{Priority, Task, User};
use crate::query::{ListParams, TaskQuery};
use crate::store::{Store, StoreError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// Window for the "due soon" badge, in days.
const DUE_SOON_DAYS: i64 = 3;

// ── View types ─────────────────────────────────────────────────

/// A task as the client sees it: the record plus the derived display
/// values (overdue flag, priority color). The owner field is omitted —
/// clients only ever see their own tasks.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub priority_color: &'static str,
    pub due_date: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub is_due_soon: bool,
    pub days_until_due: Option<i64>,
    pub tags: Vec<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn task_view(task: Task, now: DateTime<Utc>) -> TaskView {
    TaskView {
        id: task.id,
        is_overdue: task.is_overdue(now),
        is_due_soon: task.is_due_soon(now, DUE_SOON_DAYS),
        days_until_due: task.days_until_due(now),
        priority_color: task.priority.color(),
        title: task.title,
        description: task.description,
        completed: task.completed,
        priority: task.priority,
        due_date: task.due_date,
        tags: task.tags,
        color: task.color,
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

/// Counts over the user's whole task set, not the filtered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub overdue: usize,
    pub progress: u32,
}

fn compute_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();
    let progress = if total > 0 {
        (completed * 100 / total) as u32
    } else {
        0
    };

    TaskStats {
        total,
        completed,
        active: total - completed,
        overdue,
        progress,
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
    pub stats: TaskStats,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub completed: bool,
}

// ── Ownership gate ─────────────────────────────────────────────

/// Load a task and require the caller to own it. Missing and foreign
/// both come back NotFound, before any field is read.
fn fetch_owned(store: &Store, id: Uuid, owner: Uuid) -> Result<Task, ApiError> {
    let task = store.get_task(id)?.ok_or(ApiError::NotFound)?;
    if task.owner != owner {
        return Err(ApiError::NotFound);
    }
    Ok(task)
}

// ── Handlers ───────────────────────────────────────────────────

// GET /api/tasks?status=&search=&sort=&priority=
pub async fn list_tasks(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Query(params): Query<ListParams>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let now = Utc::now();
    let all = state.store.tasks_for_user(user.id)?;
    let stats = compute_stats(&all, now);

    let tasks = TaskQuery::from_params(&params)
        .apply(all)
        .into_iter()
        .map(|t| task_view(t, now))
        .collect();

    Ok(Json(TaskListResponse { tasks, stats }))
}

// POST /api/tasks
pub async fn create_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(form): Json<TaskForm>,
) -> Result<(StatusCode, Json<TaskView>), ApiError> {
    let now = Utc::now();
    let valid = form.validate(now).map_err(|errors| {
        tracing::warn!(user = %user.username, "task form rejected");
        ApiError::Validation(errors)
    })?;

    let task = valid.into_task(user.id, now);
    state.store.put_task(&task)?;

    tracing::info!(
        task = %task.id,
        user = %user.username,
        priority = task.priority.as_str(),
        "task created"
    );
    Ok((StatusCode::CREATED, Json(task_view(task, now))))
}

// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskView>, ApiError> {
    let task = fetch_owned(&state.store, id, user.id)?;
    Ok(Json(task_view(task, Utc::now())))
}

// PUT /api/tasks/:id
pub async fn update_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(form): Json<TaskForm>,
) -> Result<Json<TaskView>, ApiError> {
    // Ownership first: a foreign id must 404 before the form is looked at.
    let mut task = fetch_owned(&state.store, id, user.id)?;

    let now = Utc::now();
    let valid = form.validate(now).map_err(|errors| {
        tracing::warn!(task = %id, user = %user.username, "task form rejected");
        ApiError::Validation(errors)
    })?;

    valid.apply_to(&mut task, now);
    state.store.put_task(&task)?;

    tracing::info!(task = %task.id, user = %user.username, "task updated");
    Ok(Json(task_view(task, now)))
}

// POST /api/tasks/:id/toggle
pub async fn toggle_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let mut task = fetch_owned(&state.store, id, user.id)?;

    // A flip, not a set: double submission returns to the original state.
    let completed = task.toggle_completion(Utc::now());
    state.store.put_task(&task)?;

    tracing::info!(task = %task.id, user = %user.username, completed, "task toggled");
    Ok(Json(ToggleResponse { completed }))
}

// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let task = fetch_owned(&state.store, id, user.id)?;

    if !state.store.delete_task(task.id)? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(task = %id, user = %user.username, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    /// Field → messages map; the client re-renders the form.
    Validation(ValidationErrors),
    Unauthorized(&'static str),
    NotFound,
    Internal(String),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
            }
            // Details go to the log; the client gets a generic body.
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
            ApiError::Store(e) => {
                tracing::error!(error = %e, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
