use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::cache;
use crate::errors::AppError;
use crate::feed::DedupWindow;
use crate::models::notification::Notification;
use crate::AppState;

#[derive(Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct UnreadResponse {
    pub unread: i64,
}

const DEFAULT_PAGE: i64 = 20;
const MAX_PAGE: i64 = 100;
const UNREAD_CACHE_TTL_SECS: u64 = 30;
const HEARTBEAT_SECS: u64 = 15;

/// GET /notifications — caller's received notifications, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let offset = params.offset.unwrap_or(0).max(0);

    let notifs = state
        .db
        .list_received_notifications(caller.id, limit, offset)
        .await?;
    Ok(Json(notifs))
}

/// GET /notifications/unread — unread count, cached briefly.
pub async fn count_unread(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<UnreadResponse>, AppError> {
    let key = cache::unread_count_key(caller.id);
    if let Some(cached) = state.cache.get::<i64>(&key).await {
        return Ok(Json(UnreadResponse { unread: cached }));
    }

    let unread = state.db.count_unread(caller.id).await?;
    if let Err(e) = state.cache.set(&key, &unread, UNREAD_CACHE_TTL_SECS).await {
        tracing::warn!("unread-count cache write failed: {}", e);
    }
    Ok(Json(UnreadResponse { unread }))
}

/// PATCH /notifications/:id/read — recipient only.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notif = state
        .db
        .get_notification(id)
        .await?
        .ok_or(AppError::NotFound("notification"))?;

    if !notif.can_mark_read(caller.id) {
        return Err(AppError::Forbidden(
            "only the recipient may mark a notification read",
        ));
    }

    let updated = state
        .db
        .mark_notification_read(id)
        .await?
        .ok_or(AppError::NotFound("notification"))?;
    state
        .cache
        .invalidate(&cache::unread_count_key(caller.id))
        .await;

    Ok(Json(updated))
}

/// GET /notifications/stream — SSE feed of the caller's live notifications.
///
/// Events carry the full notification JSON under the `notification` event
/// name. Idle connections get heartbeat comments. A subscriber that lags
/// past the channel buffer is disconnected rather than back-pressuring
/// writers; clients reconnect and reconcile via GET /notifications.
pub async fn stream_notifications(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.feed.subscribe(caller.id);
    let window = DedupWindow::new(256);
    let user_id = caller.id;

    let stream = stream::unfold((rx, window), move |(mut rx, mut window)| async move {
        loop {
            match tokio::time::timeout(Duration::from_secs(HEARTBEAT_SECS), rx.recv()).await {
                Err(_) => {
                    return Some((Ok(Event::default().comment("heartbeat")), (rx, window)));
                }
                Ok(Ok(n)) => {
                    if !window.insert(n.id) {
                        continue;
                    }
                    let data = serde_json::to_string(&n).unwrap_or_default();
                    return Some((
                        Ok(Event::default().event("notification").data(data)),
                        (rx, window),
                    ));
                }
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::warn!(user = %user_id, skipped, "notification stream lagged, closing");
                    return None;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
