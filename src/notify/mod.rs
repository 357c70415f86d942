//! Outbound routing notifications

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const LEAD_ASSIGNED: &str = "lead.assigned";
pub const DUPLICATES_DETECTED: &str = "duplicates.detected";
pub const GROUP_MERGED: &str = "duplicate_group.merged";
pub const GROUP_IGNORED: &str = "duplicate_group.ignored";
pub const GROUP_RETRIGGERED: &str = "duplicate_group.retriggered";
pub const RULE_CREATED: &str = "rule.created";
pub const RULE_UPDATED: &str = "rule.updated";
pub const RULE_DELETED: &str = "rule.deleted";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingEvent {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl RoutingEvent {
    pub fn new(event_type: &str, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Sink for routing events.
///
/// Delivery is fire-and-forget: callers ignore the result, and a failing
/// notifier never rolls back the operation that produced the event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: RoutingEvent) -> Result<()>;
}

/// Writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn publish(&self, event: RoutingEvent) -> Result<()> {
        tracing::info!(
            event_type = %event.event_type,
            timestamp = %event.timestamp,
            data = %event.data,
            "routing event"
        );
        Ok(())
    }
}
