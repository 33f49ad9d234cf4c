mod client;
pub mod files;
pub mod models;

pub use client::{Webhook, WebhookClient, USER_AGENT};
