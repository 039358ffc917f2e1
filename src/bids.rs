//! Bid workflow rules, kept out of the SQL path so they are testable
//! without a database. The store re-runs [`check_bid`] inside its
//! transaction after taking the row lock, and builds the accept/decline
//! notices through the constructors here.

use uuid::Uuid;

use crate::models::notification::{NewNotification, Notification, NotificationKind};
use crate::models::task::Task;

/// Whether a worker may place a bid right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidCheck {
    Allowed,
    /// Owners cannot bid on their own task.
    OwnTask,
    /// The task is assigned, completed or cancelled.
    TaskClosed,
    /// The worker already has a live bid on this task.
    Duplicate,
}

pub fn check_bid(task: &Task, worker: Uuid, has_live_bid: bool) -> BidCheck {
    if task.owner_id == worker {
        BidCheck::OwnTask
    } else if !task.is_open() {
        BidCheck::TaskClosed
    } else if has_live_bid {
        BidCheck::Duplicate
    } else {
        BidCheck::Allowed
    }
}

/// Whether a notification row is the live bid an owner is deciding on:
/// a bid, on this task, addressed to this owner.
pub fn bid_matches(bid: &Notification, task_id: Uuid, owner_id: Uuid) -> bool {
    bid.kind() == Some(NotificationKind::Bid)
        && bid.task_id == Some(task_id)
        && bid.recipient_id == owner_id
}

/// The single task_update written to the worker whose bid was accepted.
pub fn acceptance_notice(owner_id: Uuid, bid: &Notification, task_id: Uuid) -> NewNotification {
    NewNotification::task_update(
        owner_id,
        bid.sender_id,
        task_id,
        "Your bid was accepted and the task has been assigned to you",
    )
}

/// The single task_update written to the worker whose bid was declined.
pub fn decline_notice(owner_id: Uuid, bid: &Notification, task_id: Uuid) -> NewNotification {
    NewNotification::task_update(owner_id, bid.sender_id, task_id, "Your bid was declined")
}
