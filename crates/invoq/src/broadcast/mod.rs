//! Broadcasting for real-time event streaming.

pub mod notifier;

pub use notifier::{
    publish_best_effort, tenant_channel, BroadcastNotifier, RealtimeEvent, RealtimeNotifier,
    EVENT_OCR_COMPLETED, EVENT_OCR_FAILED,
};
