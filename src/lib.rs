//! gigboard — task-marketplace backend.
//!
//! Employers post tasks, workers bid; messages, bids and task events all
//! flow through one notification store, with chat threads derived from it
//! on every read.

pub mod api;
pub mod auth;
pub mod bids;
pub mod cache;
pub mod chat;
pub mod config;
pub mod errors;
pub mod feed;
pub mod jobs;
pub mod models;
pub mod store;
pub mod webhook;

use cache::TieredCache;
use feed::NotificationFeed;
use store::postgres::PgStore;
use webhook::WebhookNotifier;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub db: PgStore,
    pub cache: TieredCache,
    pub feed: NotificationFeed,
    pub webhook: WebhookNotifier,
    pub config: config::Config,
}
