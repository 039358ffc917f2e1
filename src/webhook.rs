//! Outbound webhook fan-out: push-gateway integration for new notifications.
//!
//! Mobile clients get push via an external gateway; this module POSTs a
//! signed event to each configured URL whenever a notification is written.

use std::time::Duration;

use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::models::notification::Notification;

/// Event payload sent to webhook endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    /// Always "notification.created" for now.
    pub event_type: String,
    /// ISO-8601 timestamp of dispatch.
    pub timestamp: String,
    pub notification_id: String,
    pub kind: String,
    pub recipient_id: String,
    pub task_id: Option<String>,
    /// Kind-specific details (body preview, bid amount).
    pub details: serde_json::Value,
}

impl WebhookEvent {
    pub fn notification_created(n: &Notification) -> Self {
        Self {
            event_type: "notification.created".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            notification_id: n.id.to_string(),
            kind: n.kind.clone(),
            recipient_id: n.recipient_id.to_string(),
            task_id: n.task_id.map(|t| t.to_string()),
            details: serde_json::json!({
                "sender_name": n.sender_name,
                "body": n.body,
                "bid_amount": n.bid_amount,
            }),
        }
    }
}

/// Compute HMAC-SHA256 of `payload` with `secret`, formatted as
/// "sha256=<hex>" for the `X-Gigboard-Signature` header.
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    urls: Vec<String>,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(urls: Vec<String>, secret: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            urls,
            secret,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.urls.is_empty()
    }

    /// Fire-and-forget dispatch to every configured URL. Failures are logged
    /// and never surfaced to the request that triggered them.
    pub fn dispatch(&self, event: WebhookEvent) {
        if self.urls.is_empty() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_all(&event).await {
                warn!("webhook dispatch failed: {}", e);
            }
        });
    }

    async fn send_all(&self, event: &WebhookEvent) -> Result<()> {
        let payload = serde_json::to_vec(event)?;
        for url in &self.urls {
            let mut req = self
                .client
                .post(url)
                .header("content-type", "application/json")
                .body(payload.clone());
            if let Some(secret) = &self.secret {
                req = req.header("x-gigboard-signature", hmac_sha256_hex(secret, &payload));
            }
            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(url = %url, "webhook delivered");
                }
                Ok(resp) => {
                    warn!(url = %url, status = %resp.status(), "webhook endpoint returned error");
                }
                Err(e) => {
                    warn!(url = %url, "webhook request failed: {}", e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn event_carries_notification_fields() {
        let n = Notification {
            id: Uuid::new_v4(),
            kind: "bid".into(),
            sender_id: Uuid::new_v4(),
            sender_name: "Worker".into(),
            recipient_id: Uuid::new_v4(),
            recipient_name: "Employer".into(),
            task_id: Some(Uuid::new_v4()),
            body: "bid note".into(),
            bid_amount: Some(Decimal::new(12500, 2)),
            is_read: false,
            created_at: Utc::now(),
            updated_at: None,
        };

        let event = WebhookEvent::notification_created(&n);
        assert_eq!(event.event_type, "notification.created");
        assert_eq!(event.kind, "bid");
        assert_eq!(event.notification_id, n.id.to_string());
        assert_eq!(event.details["sender_name"], "Worker");
        assert_eq!(event.details["bid_amount"], serde_json::json!("125.00"));
        assert!(!event.timestamp.is_empty());
    }

    #[test]
    fn signature_is_stable_and_keyed() {
        let sig1 = hmac_sha256_hex("secret", b"payload");
        let sig2 = hmac_sha256_hex("secret", b"payload");
        let sig3 = hmac_sha256_hex("other", b"payload");
        assert_eq!(sig1, sig2);
        assert_ne!(sig1, sig3);
        assert!(sig1.starts_with("sha256="));
    }
}
