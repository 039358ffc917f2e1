//! In-process live notification feed.
//!
//! One broadcast channel per user, created lazily on first subscribe or
//! publish. Every committed notification is published to both the sender's
//! and the recipient's channel, so a subscriber sees the union of its sent
//! and received traffic. Subscribers run the events through [`DedupWindow`]
//! before delivery to guard against re-publication.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::notification::Notification;

/// Per-channel buffer. A subscriber that falls further behind than this is
/// lagged and its stream ends; writers are never back-pressured.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct NotificationFeed {
    channels: Arc<DashMap<Uuid, broadcast::Sender<Notification>>>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Subscribe to a user's live feed.
    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<Notification> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a committed notification to both participants' channels.
    /// Channels with no live subscribers are dropped on the spot.
    pub fn publish(&self, notification: &Notification) {
        for user in [notification.sender_id, notification.recipient_id] {
            if let Some(tx) = self.channels.get(&user) {
                if tx.send(notification.clone()).is_err() {
                    drop(tx);
                    self.channels
                        .remove_if(&user, |_, sender| sender.receiver_count() == 0);
                }
            }
        }
    }

    /// Number of users with an open channel (for diagnostics).
    pub fn active_channels(&self) -> usize {
        self.channels.len()
    }
}

/// Bounded ring of recently-seen ids. The feed may re-deliver (two channels,
/// re-publication on retry); consumers pass every event through this before
/// emitting it.
pub struct DedupWindow {
    seen: VecDeque<Uuid>,
    capacity: usize,
}

impl DedupWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns true the first time an id is observed.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if self.seen.contains(&id) {
            return false;
        }
        if self.seen.len() == self.capacity {
            self.seen.pop_front();
        }
        self.seen.push_back(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notif(sender: Uuid, recipient: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: "message".into(),
            sender_id: sender,
            sender_name: "s".into(),
            recipient_id: recipient,
            recipient_name: "r".into(),
            task_id: Some(Uuid::new_v4()),
            body: "hello".into(),
            bid_amount: None,
            is_read: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn both_participants_receive() {
        let feed = NotificationFeed::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = feed.subscribe(a);
        let mut rx_b = feed.subscribe(b);

        let n = notif(a, b);
        feed.publish(&n);

        assert_eq!(rx_a.recv().await.unwrap().id, n.id);
        assert_eq!(rx_b.recv().await.unwrap().id, n.id);
    }

    #[tokio::test]
    async fn task_announcements_reach_each_worker() {
        // Same fan-out shape task creation produces: one new_task row per
        // worker, all published after the insert commits.
        let feed = NotificationFeed::new();
        let owner = Uuid::new_v4();
        let workers: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut receivers: Vec<_> = workers.iter().map(|w| feed.subscribe(*w)).collect();

        for worker in &workers {
            let mut n = notif(owner, *worker);
            n.kind = "new_task".into();
            feed.publish(&n);
        }

        for (rx, worker) in receivers.iter_mut().zip(&workers) {
            let got = rx.recv().await.unwrap();
            assert_eq!(got.kind, "new_task");
            assert_eq!(got.recipient_id, *worker);
            // Only their own row; the other workers' rows went elsewhere.
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let feed = NotificationFeed::new();
        feed.publish(&notif(Uuid::new_v4(), Uuid::new_v4()));
        assert_eq!(feed.active_channels(), 0);
    }

    #[tokio::test]
    async fn self_message_delivered_once_per_channel() {
        // sender == recipient collapses to one channel; the dedup window
        // downstream drops the duplicate send.
        let feed = NotificationFeed::new();
        let a = Uuid::new_v4();
        let mut rx = feed.subscribe(a);

        let n = notif(a, a);
        feed.publish(&n);

        let mut window = DedupWindow::new(16);
        let first = rx.recv().await.unwrap();
        assert!(window.insert(first.id));
        let second = rx.recv().await.unwrap();
        assert!(!window.insert(second.id));
    }

    #[test]
    fn dedup_window_bounds_memory() {
        let mut window = DedupWindow::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert!(window.insert(a));
        assert!(window.insert(b));
        assert!(!window.insert(a));
        assert!(window.insert(c)); // evicts a
        assert!(window.insert(a)); // a was evicted, counts as new
    }
}
