use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Created,
    Assigned,
    InTransit,
    ArrivedZone,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub status: DeliveryStatus,
    pub client_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    pub destination_point_id: Uuid,
    pub pickup_point_id: Option<Uuid>,
    /// Opaque line-item payload; the engine never looks inside.
    pub items: serde_json::Value,
    /// Shared secret for in-person OTP verification. Never serialized
    /// outward.
    #[serde(skip_serializing)]
    pub confirmation_code: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
