use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::fanout;
use crate::auth::AuthUser;
use crate::chat::{build_chat_list, merge_messages};
use crate::errors::AppError;
use crate::models::chat::ChatThread;
use crate::models::notification::{NewNotification, Notification};
use crate::models::task::Task;
use crate::AppState;

#[derive(Deserialize)]
pub struct OpenChatRequest {
    pub task_id: Uuid,
    pub recipient_id: Uuid,
    pub body: String,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub body: String,
}

/// GET /chats — the caller's chat-thread list, most-recently-active first.
/// Pure projection over the caller's notification set; nothing persisted.
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<ChatThread>>, AppError> {
    let notifs = state.db.list_user_notifications(caller.id).await?;
    Ok(Json(build_chat_list(&notifs, caller.id)))
}

/// POST /chats — open a conversation by sending the first message for a
/// task. Threads have no lifecycle of their own, so "creating a chat" is
/// just writing the opening message notification.
pub async fn open_chat(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<OpenChatRequest>,
) -> Result<(StatusCode, Json<ChatThread>), AppError> {
    let task = state
        .db
        .get_task(payload.task_id)
        .await?
        .ok_or(AppError::NotFound("task"))?;

    let message = validate_message(
        &task,
        &state,
        caller.id,
        payload.recipient_id,
        &payload.body,
    )
    .await?;

    let sent = state.db.insert_notification(&message).await?;
    fanout(&state, &sent).await;

    let (other_id, other_name) = sent
        .counterparty(caller.id)
        .map(|(id, name)| (id, name.to_string()))
        .unwrap_or((payload.recipient_id, String::new()));

    Ok((
        StatusCode::CREATED,
        Json(ChatThread {
            chat_id: task.id,
            other_user_id: other_id,
            other_user_name: other_name,
            last_message: sent,
            unread_count: 0,
        }),
    ))
}

/// GET /chats/:task_id/messages — merged ascending message list for the
/// caller on this task: union of sent and received, deduplicated by id.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let task = state
        .db
        .get_task(task_id)
        .await?
        .ok_or(AppError::NotFound("task"))?;

    if !task.is_participant(caller.id)
        && !state.db.user_in_task_thread(task_id, caller.id).await?
    {
        return Err(AppError::Forbidden("not a participant in this chat"));
    }

    let sent = state.db.list_task_sent(task_id, caller.id).await?;
    let received = state.db.list_task_received(task_id, caller.id).await?;
    Ok(Json(merge_messages(sent, received)))
}

/// POST /chats/:task_id/messages — send a message to the counterparty.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let task = state
        .db
        .get_task(task_id)
        .await?
        .ok_or(AppError::NotFound("task"))?;

    let message = validate_message(&task, &state, caller.id, payload.recipient_id, &payload.body)
        .await?;

    let sent = state.db.insert_notification(&message).await?;
    fanout(&state, &sent).await;
    Ok((StatusCode::CREATED, Json(sent)))
}

/// Shared checks for message sends: non-empty body, distinct live recipient,
/// and both ends tied to the task (the owner, the assignee, or someone
/// already in the thread).
async fn validate_message(
    task: &Task,
    state: &AppState,
    sender: Uuid,
    recipient: Uuid,
    body: &str,
) -> Result<NewNotification, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::Validation("message body is required".into()));
    }
    if recipient == sender {
        return Err(AppError::Validation("cannot message yourself".into()));
    }

    let recipient_row = state
        .db
        .get_user(recipient)
        .await?
        .ok_or(AppError::NotFound("recipient"))?;
    if !recipient_row.is_active {
        return Err(AppError::NotFound("recipient"));
    }

    // One end of every message must be the task owner: conversations are
    // between the poster and an interested worker.
    if task.owner_id != sender && task.owner_id != recipient {
        return Err(AppError::Validation(
            "messages must involve the task owner".into(),
        ));
    }

    // Anyone may open a thread with the owner; replying to a worker requires
    // the worker to already be in the thread.
    let recipient_ok = recipient == task.owner_id
        || task.is_participant(recipient)
        || state.db.user_in_task_thread(task.id, recipient).await?;
    if !recipient_ok {
        return Err(AppError::Forbidden("recipient is not part of this chat"));
    }

    Ok(NewNotification::message(
        sender,
        recipient,
        task.id,
        body.trim(),
    ))
}
