use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::cache;
use crate::models::notification::Notification;
use crate::webhook::WebhookEvent;
use crate::AppState;

pub mod auth;
pub mod categories;
pub mod chats;
pub mod notifications;
pub mod profile;
pub mod tasks;

/// Build the REST router. All routes are relative; the caller mounts this at
/// the application root. Everything except register/login sits behind the
/// bearer-token middleware.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/auth/change-password", post(auth::change_password))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/:id/bids", post(tasks::submit_bid))
        .route("/tasks/:id/assign", patch(tasks::assign_task))
        .route("/tasks/:id/decline", patch(tasks::decline_bid))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread", get(notifications::count_unread))
        .route("/notifications/:id/read", patch(notifications::mark_read))
        .route(
            "/notifications/stream",
            get(notifications::stream_notifications),
        )
        .route("/chats", get(chats::list_chats).post(chats::open_chat))
        .route(
            "/chats/:task_id/messages",
            get(chats::list_messages).post(chats::send_message),
        )
        .route("/categories", get(categories::list_categories))
        .route("/profile/me", get(profile::me))
        .layer(middleware::from_fn_with_state(
            state,
            crate::auth::require_auth,
        ));

    public.merge(protected).fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Post-commit fan-out for a freshly written notification: live feed,
/// unread-count cache invalidation, outbound webhooks.
pub(crate) async fn fanout(state: &AppState, notification: &Notification) {
    state.feed.publish(notification);
    state
        .cache
        .invalidate(&cache::unread_count_key(notification.recipient_id))
        .await;
    state
        .webhook
        .dispatch(WebhookEvent::notification_created(notification));
}
