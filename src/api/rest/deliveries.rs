use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{audit, machine};
use crate::error::EngineError;
use crate::models::delivery::Delivery;
use crate::models::log::DeliveryLog;
use crate::models::point::PointInput;
use crate::models::proof::ProofSubmission;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries", post(create_delivery))
        .route("/deliveries/:id", get(get_delivery))
        .route("/deliveries/:id/assign", post(assign))
        .route("/deliveries/:id/transit", post(advance_to_transit))
        .route("/deliveries/:id/arrive", post(arrive_at_zone))
        .route("/deliveries/:id/complete", post(complete))
        .route("/deliveries/:id/fail", post(fail))
        .route("/deliveries/:id/logs", get(replay_logs))
}

#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub client_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub destination: PointInput,
    pub pickup: Option<PointInput>,
    #[serde(default)]
    pub items: serde_json::Value,
    pub confirmation_code: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub courier_id: Uuid,
    pub actor_id: Option<Uuid>,
}

#[derive(Deserialize, Default)]
pub struct ProgressRequest {
    pub actor_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub proof: ProofSubmission,
    pub actor_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct FailRequest {
    pub reason: String,
    pub actor_id: Option<Uuid>,
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<Json<Delivery>, EngineError> {
    let delivery = machine::create(
        &state,
        machine::CreateDelivery {
            client_id: payload.client_id,
            seller_id: payload.seller_id,
            destination: payload.destination,
            pickup: payload.pickup,
            items: payload.items,
            confirmation_code: payload.confirmation_code,
        },
    )
    .await?;

    Ok(Json(delivery))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, EngineError> {
    let delivery = state
        .store
        .delivery(id)?
        .ok_or_else(|| EngineError::NotFound(format!("delivery {id} not found")))?;

    Ok(Json(delivery))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Delivery>, EngineError> {
    let delivery = machine::assign(&state, id, payload.courier_id, payload.actor_id)?;
    Ok(Json(delivery))
}

async fn advance_to_transit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<Delivery>, EngineError> {
    let delivery = machine::advance_to_transit(&state, id, payload.actor_id)?;
    Ok(Json(delivery))
}

async fn arrive_at_zone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<Delivery>, EngineError> {
    let delivery = machine::arrive_at_zone(&state, id, payload.actor_id)?;
    Ok(Json(delivery))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<Delivery>, EngineError> {
    let delivery = machine::complete(&state, id, payload.proof, payload.actor_id)?;
    Ok(Json(delivery))
}

async fn fail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FailRequest>,
) -> Result<Json<Delivery>, EngineError> {
    let delivery = machine::fail(&state, id, payload.reason, payload.actor_id)?;
    Ok(Json(delivery))
}

async fn replay_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DeliveryLog>>, EngineError> {
    let logs = audit::replay(state.store.as_ref(), id)?;
    Ok(Json(logs))
}
