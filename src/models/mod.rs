pub mod category;
pub mod chat;
pub mod notification;
pub mod task;
pub mod user;
