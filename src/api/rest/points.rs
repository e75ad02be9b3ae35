use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::registry;
use crate::error::EngineError;
use crate::models::point::{DeliveryPoint, PointInput};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/points/resolve", post(resolve_point))
        .route("/points/:id", get(get_point))
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub point: DeliveryPoint,
    pub created: bool,
}

async fn resolve_point(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PointInput>,
) -> Result<Json<ResolveResponse>, EngineError> {
    let (point, created) = registry::resolve(&state, payload)?;
    Ok(Json(ResolveResponse { point, created }))
}

async fn get_point(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryPoint>, EngineError> {
    let point = state
        .store
        .point(id)?
        .ok_or_else(|| EngineError::NotFound(format!("point {id} not found")))?;

    Ok(Json(point))
}
