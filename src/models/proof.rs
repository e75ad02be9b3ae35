use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::point::GeoPoint;

/// What a courier submits when completing a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub photo_url: Option<String>,
    pub signature: Option<String>,
    pub otp: Option<String>,
    pub location: Option<GeoPoint>,
}

/// The evidentiary record persisted when a delivery reaches `Delivered`.
/// One per delivery, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofOfDelivery {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub photo_url: Option<String>,
    pub signature: Option<String>,
    pub otp: Option<String>,
    pub location: Option<GeoPoint>,
    pub delivered_at: DateTime<Utc>,
}
