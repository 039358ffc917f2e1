use serde::Serialize;
use uuid::Uuid;

use super::notification::Notification;

/// Derived chat-thread summary. Never persisted: recomputed from the
/// notification set on every read, so it has no lifecycle of its own.
#[derive(Debug, Clone, Serialize)]
pub struct ChatThread {
    /// Threads are keyed by task: one thread per task the user has
    /// exchanged notifications over.
    pub chat_id: Uuid,
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub last_message: Notification,
    pub unread_count: usize,
}
