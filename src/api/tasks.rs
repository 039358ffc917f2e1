use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::fanout;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::notification::Notification;
use crate::models::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::store::postgres::{BidDecision, BidOutcome, TaskFilter};
use crate::AppState;

#[derive(Deserialize)]
pub struct TaskListParams {
    pub status: Option<String>,
    pub category_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct BidRequest {
    pub amount: Decimal,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct BidDecisionRequest {
    /// Id of the bid notification being accepted or declined.
    pub bid_id: Uuid,
}

#[derive(Serialize)]
pub struct AssignResponse {
    pub task: Task,
    pub notification: Notification,
}

const DEFAULT_PAGE: i64 = 20;
const MAX_PAGE: i64 = 100;

fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// GET /tasks — browse tasks, newest first.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<Vec<Task>>, AppError> {
    if let Some(s) = &params.status {
        if TaskStatus::parse(s).is_none() {
            return Err(AppError::Validation(format!("unknown status: {}", s)));
        }
    }
    let (limit, offset) = page(params.limit, params.offset);

    let tasks = state
        .db
        .list_tasks(&TaskFilter {
            status: params.status,
            category_id: params.category_id,
            owner_id: params.owner_id,
            limit,
            offset,
        })
        .await?;
    Ok(Json(tasks))
}

/// POST /tasks — post a task. New-task notifications to workers are written
/// in the same transaction as the task row and fanned out after commit.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    if payload.budget <= Decimal::ZERO {
        return Err(AppError::Validation("budget must be positive".into()));
    }

    let (task, announcements) = state
        .db
        .create_task(caller.id, &caller.name, &payload)
        .await?;
    for announcement in &announcements {
        fanout(&state, announcement).await;
    }
    tracing::info!(
        task = %task.id,
        owner = %caller.id,
        notified = announcements.len(),
        "task created"
    );

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /tasks/:id
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = state.db.get_task(id).await?.ok_or(AppError::NotFound("task"))?;
    Ok(Json(task))
}

/// PATCH /tasks/:id — owner-only edits. Assignment goes through /assign.
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }
    if let Some(s) = &patch.status {
        match TaskStatus::parse(s) {
            None => return Err(AppError::Validation(format!("unknown status: {}", s))),
            Some(TaskStatus::Assigned) => {
                return Err(AppError::Validation(
                    "assign via PATCH /tasks/:id/assign".into(),
                ))
            }
            Some(_) => {}
        }
    }
    if let Some(b) = patch.budget {
        if b <= Decimal::ZERO {
            return Err(AppError::Validation("budget must be positive".into()));
        }
    }

    let task = state.db.get_task(id).await?.ok_or(AppError::NotFound("task"))?;
    if task.owner_id != caller.id {
        return Err(AppError::Forbidden("only the task owner may edit it"));
    }

    let updated = state
        .db
        .update_task(id, &patch)
        .await?
        .ok_or(AppError::NotFound("task"))?;
    Ok(Json(updated))
}

/// DELETE /tasks/:id — owner-only, open tasks only.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let task = state.db.get_task(id).await?.ok_or(AppError::NotFound("task"))?;
    if task.owner_id != caller.id {
        return Err(AppError::Forbidden("only the task owner may delete it"));
    }
    if !state.db.delete_open_task(id).await? {
        return Err(AppError::Conflict(
            "only open tasks can be deleted".into(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /tasks/:id/bids — submit a bid. Creates exactly one bid notification
/// to the owner; a second live bid from the same worker is rejected.
pub async fn submit_bid(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BidRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::Validation("bid amount must be positive".into()));
    }

    if state.db.get_task(id).await?.is_none() {
        return Err(AppError::NotFound("task"));
    }

    let note = payload.note.unwrap_or_default();
    match state.db.create_bid(id, caller.id, payload.amount, &note).await? {
        BidOutcome::Created(bid) => {
            fanout(&state, &bid).await;
            tracing::info!(task = %id, worker = %caller.id, "bid submitted");
            Ok((StatusCode::CREATED, Json(bid)))
        }
        BidOutcome::OwnTask => Err(AppError::Forbidden("cannot bid on your own task")),
        BidOutcome::Duplicate => Err(AppError::Conflict(
            "you already have a bid on this task".into(),
        )),
        BidOutcome::TaskClosed => Err(AppError::Conflict("task is no longer open".into())),
    }
}

/// PATCH /tasks/:id/assign — accept a bid. Assigns the task, removes the bid
/// notification, and notifies the worker in one transaction.
pub async fn assign_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BidDecisionRequest>,
) -> Result<Json<AssignResponse>, AppError> {
    let task = state.db.get_task(id).await?.ok_or(AppError::NotFound("task"))?;
    if task.owner_id != caller.id {
        return Err(AppError::Forbidden("only the task owner may assign it"));
    }

    match state.db.assign_task(id, payload.bid_id, caller.id).await? {
        BidDecision::Done(notice) => {
            fanout(&state, &notice).await;
            let task = state.db.get_task(id).await?.ok_or(AppError::NotFound("task"))?;
            tracing::info!(task = %id, worker = %notice.recipient_id, "task assigned");
            Ok(Json(AssignResponse {
                task,
                notification: notice,
            }))
        }
        BidDecision::BidNotFound => Err(AppError::NotFound("bid")),
        BidDecision::TaskClosed => Err(AppError::Conflict("task is no longer open".into())),
    }
}

/// PATCH /tasks/:id/decline — decline a bid. Removes the bid notification
/// and notifies the worker; the task stays open.
pub async fn decline_bid(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BidDecisionRequest>,
) -> Result<Json<Notification>, AppError> {
    let task = state.db.get_task(id).await?.ok_or(AppError::NotFound("task"))?;
    if task.owner_id != caller.id {
        return Err(AppError::Forbidden("only the task owner may decline bids"));
    }

    match state.db.decline_bid(id, payload.bid_id, caller.id).await? {
        BidDecision::Done(notice) => {
            fanout(&state, &notice).await;
            tracing::info!(task = %id, worker = %notice.recipient_id, "bid declined");
            Ok(Json(notice))
        }
        BidDecision::BidNotFound => Err(AppError::NotFound("bid")),
        BidDecision::TaskClosed => Err(AppError::Conflict("task is no longer open".into())),
    }
}
