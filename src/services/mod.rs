//! Outbound, best-effort notifications

pub mod usage;
pub mod webhook;

pub use usage::UsageTracker;
pub use webhook::WebhookNotifier;
