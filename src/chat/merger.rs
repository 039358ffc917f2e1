use std::collections::HashSet;

use uuid::Uuid;

use crate::models::notification::Notification;

/// Merge the sent-by-me and received-by-me notification sets for one task
/// into a single ascending message list.
///
/// A record cannot normally appear in both sets, but the union dedups by id
/// anyway to guard against re-delivery. Equal timestamps order by id so the
/// result is stable across recomputation.
pub fn merge_messages(sent: Vec<Notification>, received: Vec<Notification>) -> Vec<Notification> {
    let mut seen: HashSet<Uuid> = HashSet::with_capacity(sent.len() + received.len());
    let mut merged: Vec<Notification> = Vec::with_capacity(sent.len() + received.len());

    for n in sent.into_iter().chain(received) {
        if seen.insert(n.id) {
            merged.push(n);
        }
    }

    merged.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn notif(offset_secs: i64) -> Notification {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        Notification {
            id: Uuid::new_v4(),
            kind: "message".into(),
            sender_id: me,
            sender_name: "me".into(),
            recipient_id: other,
            recipient_name: "other".into(),
            task_id: Some(Uuid::new_v4()),
            body: "body".into(),
            bid_amount: None,
            is_read: false,
            created_at: Utc::now() + Duration::seconds(offset_secs),
            updated_at: None,
        }
    }

    #[test]
    fn merges_in_ascending_order() {
        let a = notif(0);
        let b = notif(5);
        let c = notif(10);

        let merged = merge_messages(vec![b.clone()], vec![c.clone(), a.clone()]);
        let ids: Vec<Uuid> = merged.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn never_drops_or_duplicates() {
        // Re-delivery: the same record shows up in both sets.
        let shared = notif(3);
        let sent = vec![notif(0), shared.clone(), notif(6)];
        let received = vec![shared.clone(), notif(9)];

        let merged = merge_messages(sent.clone(), received.clone());

        let mut expected: HashSet<Uuid> = HashSet::new();
        expected.extend(sent.iter().map(|n| n.id));
        expected.extend(received.iter().map(|n| n.id));

        let got: HashSet<Uuid> = merged.iter().map(|n| n.id).collect();
        assert_eq!(got, expected);
        assert_eq!(merged.len(), expected.len());
    }

    #[test]
    fn equal_timestamps_stable_by_id() {
        let ts = Utc::now();
        let mut a = notif(0);
        let mut b = notif(0);
        a.created_at = ts;
        b.created_at = ts;

        let forward = merge_messages(vec![a.clone()], vec![b.clone()]);
        let reverse = merge_messages(vec![b], vec![a]);
        let f: Vec<Uuid> = forward.iter().map(|n| n.id).collect();
        let r: Vec<Uuid> = reverse.iter().map(|n| n.id).collect();
        assert_eq!(f, r);
    }

    #[test]
    fn empty_sides() {
        assert!(merge_messages(vec![], vec![]).is_empty());
        let one = notif(0);
        assert_eq!(merge_messages(vec![one.clone()], vec![]).len(), 1);
        assert_eq!(merge_messages(vec![], vec![one]).len(), 1);
    }
}
