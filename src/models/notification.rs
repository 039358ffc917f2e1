use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a notification row represents. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Message,
    Bid,
    TaskUpdate,
    NewTask,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Message => "message",
            NotificationKind::Bid => "bid",
            NotificationKind::TaskUpdate => "task_update",
            NotificationKind::NewTask => "new_task",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(NotificationKind::Message),
            "bid" => Some(NotificationKind::Bid),
            "task_update" => Some(NotificationKind::TaskUpdate),
            "new_task" => Some(NotificationKind::NewTask),
            _ => None,
        }
    }
}

/// A typed record directed at one recipient: a chat message, a bid on a
/// task, or a task-state event. Immutable after insert except `is_read` /
/// `updated_at`; bid rows are deleted once accepted or declined.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub task_id: Option<Uuid>,
    pub body: String,
    pub bid_amount: Option<Decimal>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn kind(&self) -> Option<NotificationKind> {
        NotificationKind::parse(&self.kind)
    }

    /// Only the recipient may mark a notification read.
    pub fn can_mark_read(&self, caller: Uuid) -> bool {
        self.recipient_id == caller
    }

    /// The participant who is not `me`. None when `me` is not a participant.
    pub fn counterparty(&self, me: Uuid) -> Option<(Uuid, &str)> {
        if self.sender_id == me {
            Some((self.recipient_id, self.recipient_name.as_str()))
        } else if self.recipient_id == me {
            Some((self.sender_id, self.sender_name.as_str()))
        } else {
            None
        }
    }
}

/// Insert payload. Timestamps and the read flag are server-assigned.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub task_id: Option<Uuid>,
    pub body: String,
    pub bid_amount: Option<Decimal>,
}

impl NewNotification {
    pub fn message(sender: Uuid, recipient: Uuid, task: Uuid, body: impl Into<String>) -> Self {
        NewNotification {
            kind: NotificationKind::Message,
            sender_id: sender,
            recipient_id: recipient,
            task_id: Some(task),
            body: body.into(),
            bid_amount: None,
        }
    }

    pub fn bid(
        worker: Uuid,
        owner: Uuid,
        task: Uuid,
        amount: Decimal,
        note: impl Into<String>,
    ) -> Self {
        NewNotification {
            kind: NotificationKind::Bid,
            sender_id: worker,
            recipient_id: owner,
            task_id: Some(task),
            body: note.into(),
            bid_amount: Some(amount),
        }
    }

    pub fn task_update(sender: Uuid, recipient: Uuid, task: Uuid, body: impl Into<String>) -> Self {
        NewNotification {
            kind: NotificationKind::TaskUpdate,
            sender_id: sender,
            recipient_id: recipient,
            task_id: Some(task),
            body: body.into(),
            bid_amount: None,
        }
    }
}
