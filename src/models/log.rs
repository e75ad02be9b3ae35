use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Created,
    Assigned,
    InTransit,
    ArrivedZone,
    Delivered,
    Failed,
}

impl LogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LogAction::Created => "created",
            LogAction::Assigned => "assigned",
            LogAction::InTransit => "in_transit",
            LogAction::ArrivedZone => "arrived_zone",
            LogAction::Delivered => "delivered",
            LogAction::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit trail entry. `seq` is assigned by the store and
/// breaks `created_at` ties deterministically during replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLog {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: LogAction,
    pub details: Option<String>,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

/// Log entry before the store has stamped id, seq and created_at.
#[derive(Debug, Clone)]
pub struct LogDraft {
    pub delivery_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: LogAction,
    pub details: Option<String>,
}
