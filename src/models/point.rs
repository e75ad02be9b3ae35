use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Raw coordinate input before the registry has resolved it to a point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointInput {
    pub lat: f64,
    pub lng: f64,
    pub description: Option<String>,
}

/// A reusable delivery location. `usage_count` is the only field that
/// changes after creation; it is incremented by the registry each time an
/// order resolves to this point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPoint {
    pub id: Uuid,
    pub location: GeoPoint,
    pub description: Option<String>,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}
