use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::point::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourierStatus {
    Available,
    Busy,
    Offline,
}

/// Last-known courier position and availability, as reported by the
/// courier's client. Identity and role checks happen upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub status: CourierStatus,
    pub available_since: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
