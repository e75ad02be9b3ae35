use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::point::{DeliveryPoint, GeoPoint, PointInput};
use crate::state::AppState;
use crate::store::PointResolution;

/// Resolve a coordinate to an existing delivery point within the
/// configured tolerance, or create a new one. Returns the point and
/// whether it was created. Either way the point's usage count reflects
/// this resolution.
pub fn resolve(
    state: &AppState,
    input: PointInput,
) -> Result<(DeliveryPoint, bool), EngineError> {
    let location = GeoPoint {
        lat: input.lat,
        lng: input.lng,
    };
    if !location.is_valid() {
        return Err(EngineError::InvalidCoordinate {
            lat: input.lat,
            lng: input.lng,
        });
    }

    let candidate = DeliveryPoint {
        id: Uuid::new_v4(),
        location,
        description: input.description,
        usage_count: 1,
        created_at: Utc::now(),
    };

    let resolution = state
        .store
        .resolve_point(candidate, state.config.point_match_tolerance_m)?;

    match resolution {
        PointResolution::Created(point) => {
            state
                .metrics
                .points_resolved_total
                .with_label_values(&["created"])
                .inc();
            debug!(point_id = %point.id, "delivery point created");
            Ok((point, true))
        }
        PointResolution::Reused(point) => {
            state
                .metrics
                .points_resolved_total
                .with_label_values(&["reused"])
                .inc();
            debug!(point_id = %point.id, usage_count = point.usage_count, "delivery point reused");
            Ok((point, false))
        }
    }
}
