use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::courier::{Courier, CourierStatus};
use crate::models::point::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/status", patch(update_courier_status))
        .route("/couriers/:id/location", patch(update_courier_location))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CourierStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, EngineError> {
    if payload.name.trim().is_empty() {
        return Err(EngineError::BadRequest("name cannot be empty".to_string()));
    }

    if !payload.location.is_valid() {
        return Err(EngineError::InvalidCoordinate {
            lat: payload.location.lat,
            lng: payload.location.lng,
        });
    }

    let now = Utc::now();
    let courier = Courier {
        id: Uuid::new_v4(),
        name: payload.name,
        location: payload.location,
        status: CourierStatus::Available,
        available_since: now,
        updated_at: now,
    };

    state.store.upsert_courier(courier.clone())?;
    Ok(Json(courier))
}

async fn list_couriers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Courier>>, EngineError> {
    Ok(Json(state.store.list_couriers()?))
}

async fn update_courier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, EngineError> {
    let courier = state
        .store
        .set_courier_status(id, payload.status)?
        .ok_or_else(|| EngineError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier))
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, EngineError> {
    if !payload.location.is_valid() {
        return Err(EngineError::InvalidCoordinate {
            lat: payload.location.lat,
            lng: payload.location.lng,
        });
    }

    let courier = state
        .store
        .set_courier_location(id, payload.location)?
        .ok_or_else(|| EngineError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier))
}
