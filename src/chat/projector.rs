use std::collections::HashMap;

use uuid::Uuid;

use crate::models::chat::ChatThread;
use crate::models::notification::Notification;

/// Project a user's notifications into a chat-thread list.
///
/// Grouping is by task: every notification carrying a `task_id` lands in
/// exactly one thread, so the output has one entry per distinct task.
/// Notifications without a task (malformed or pre-migration rows) are
/// skipped. The counterparty is "the other of {sender, recipient}" on the
/// most recent notification; `unread_count` counts unread rows where `me`
/// is the recipient.
///
/// Threads order most-recently-active first. Equal timestamps break by
/// notification id so the projection is deterministic.
pub fn build_chat_list(notifications: &[Notification], me: Uuid) -> Vec<ChatThread> {
    let mut by_task: HashMap<Uuid, ThreadAccum<'_>> = HashMap::new();

    for n in notifications {
        let Some(task_id) = n.task_id else {
            tracing::debug!(notification = %n.id, "skipping notification without task_id");
            continue;
        };
        // Not a participant: defensive, the store query should not return these.
        if n.counterparty(me).is_none() {
            continue;
        }

        let acc = by_task.entry(task_id).or_default();
        if acc
            .latest
            .map(|cur| newer_than(n, cur))
            .unwrap_or(true)
        {
            acc.latest = Some(n);
        }
        if !n.is_read && n.recipient_id == me {
            acc.unread += 1;
        }
    }

    let mut threads: Vec<ChatThread> = by_task
        .into_iter()
        .filter_map(|(task_id, acc)| {
            let latest = acc.latest?;
            let (other_id, other_name) = latest.counterparty(me)?;
            Some(ChatThread {
                chat_id: task_id,
                other_user_id: other_id,
                other_user_name: other_name.to_string(),
                last_message: latest.clone(),
                unread_count: acc.unread,
            })
        })
        .collect();

    threads.sort_by(|a, b| {
        b.last_message
            .created_at
            .cmp(&a.last_message.created_at)
            .then_with(|| b.last_message.id.cmp(&a.last_message.id))
    });
    threads
}

#[derive(Default)]
struct ThreadAccum<'a> {
    latest: Option<&'a Notification>,
    unread: usize,
}

/// Strict "newer" with the id tie-break used everywhere thread order matters.
fn newer_than(a: &Notification, b: &Notification) -> bool {
    match a.created_at.cmp(&b.created_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => a.id > b.id,
    }
}
