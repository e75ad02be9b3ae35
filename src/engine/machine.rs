use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::proof;
use crate::engine::queue::enqueue_delivery;
use crate::engine::registry;
use crate::engine::transition::{self, Action};
use crate::error::EngineError;
use crate::geo::haversine_m;
use crate::models::courier::CourierStatus;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::log::{LogAction, LogDraft};
use crate::models::point::PointInput;
use crate::models::proof::ProofSubmission;
use crate::state::AppState;
use crate::store::{DeliveryUpdate, UpdateOutcome};

#[derive(Debug, Clone)]
pub struct CreateDelivery {
    pub client_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub destination: PointInput,
    pub pickup: Option<PointInput>,
    pub items: serde_json::Value,
    pub confirmation_code: Option<String>,
}

/// Resolve the delivery's points, persist it in `Created` state with its
/// first log entry, and queue it for courier assignment.
pub async fn create(state: &AppState, input: CreateDelivery) -> Result<Delivery, EngineError> {
    let (destination, _) = registry::resolve(state, input.destination)?;
    let pickup_point_id = match input.pickup {
        Some(pickup) => Some(registry::resolve(state, pickup)?.0.id),
        None => None,
    };

    let now = Utc::now();
    let delivery = Delivery {
        id: Uuid::new_v4(),
        status: DeliveryStatus::Created,
        client_id: input.client_id,
        seller_id: input.seller_id,
        courier_id: None,
        destination_point_id: destination.id,
        pickup_point_id,
        items: input.items,
        confirmation_code: input.confirmation_code,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };

    let log = state.store.insert_delivery(
        delivery.clone(),
        LogDraft {
            delivery_id: delivery.id,
            actor_id: Some(input.client_id),
            action: LogAction::Created,
            details: None,
        },
    )?;
    state.publish_lifecycle_event(&log);

    enqueue_delivery(state, delivery.id).await?;

    info!(delivery_id = %delivery.id, client_id = %input.client_id, "delivery created");
    Ok(delivery)
}

/// Legal only from `Created`. A delivery that already holds a courier
/// reports `AlreadyAssigned` instead of being silently reassigned.
pub fn assign(
    state: &AppState,
    delivery_id: Uuid,
    courier_id: Uuid,
    actor_id: Option<Uuid>,
) -> Result<Delivery, EngineError> {
    let delivery = fetch(state, delivery_id)?;
    if let (DeliveryStatus::Assigned, Some(current)) = (delivery.status, delivery.courier_id) {
        return Err(EngineError::AlreadyAssigned {
            courier_id: current,
        });
    }
    let next = transition::next_status(delivery.status, Action::Assign)?;

    commit(
        state,
        delivery_id,
        delivery.status,
        Action::Assign,
        DeliveryUpdate {
            status: next,
            courier_id: Some(courier_id),
            failure_reason: None,
            proof: None,
            log: LogDraft {
                delivery_id,
                actor_id,
                action: LogAction::Assigned,
                details: Some(format!("courier {courier_id}")),
            },
        },
    )
}

pub fn advance_to_transit(
    state: &AppState,
    delivery_id: Uuid,
    actor_id: Option<Uuid>,
) -> Result<Delivery, EngineError> {
    progress(state, delivery_id, Action::MarkInTransit, actor_id)
}

pub fn arrive_at_zone(
    state: &AppState,
    delivery_id: Uuid,
    actor_id: Option<Uuid>,
) -> Result<Delivery, EngineError> {
    progress(state, delivery_id, Action::MarkArrived, actor_id)
}

fn progress(
    state: &AppState,
    delivery_id: Uuid,
    action: Action,
    actor_id: Option<Uuid>,
) -> Result<Delivery, EngineError> {
    let delivery = fetch(state, delivery_id)?;
    let next = transition::next_status(delivery.status, action)?;

    commit(
        state,
        delivery_id,
        delivery.status,
        action,
        DeliveryUpdate {
            status: next,
            courier_id: None,
            failure_reason: None,
            proof: None,
            log: LogDraft {
                delivery_id,
                actor_id,
                action: action.log_action(),
                details: None,
            },
        },
    )
}

/// The only cancellation primitive. Legal from every non-terminal state;
/// the reason always lands in the audit trail.
pub fn fail(
    state: &AppState,
    delivery_id: Uuid,
    reason: String,
    actor_id: Option<Uuid>,
) -> Result<Delivery, EngineError> {
    if reason.trim().is_empty() {
        return Err(EngineError::BadRequest(
            "failure reason cannot be empty".to_string(),
        ));
    }

    let delivery = fetch(state, delivery_id)?;
    let next = transition::next_status(delivery.status, Action::Fail)?;

    let failed = commit(
        state,
        delivery_id,
        delivery.status,
        Action::Fail,
        DeliveryUpdate {
            status: next,
            courier_id: None,
            failure_reason: Some(reason.clone()),
            proof: None,
            log: LogDraft {
                delivery_id,
                actor_id,
                action: LogAction::Failed,
                details: Some(reason),
            },
        },
    )?;

    release_courier(state, &failed)?;
    Ok(failed)
}

/// Validate the proof, then persist proof + status + log entry as one
/// store transaction. A rejected proof leaves the delivery in
/// `ArrivedZone` so the courier can resubmit.
pub fn complete(
    state: &AppState,
    delivery_id: Uuid,
    submission: ProofSubmission,
    actor_id: Option<Uuid>,
) -> Result<Delivery, EngineError> {
    let delivery = fetch(state, delivery_id)?;
    let next = transition::next_status(delivery.status, Action::Complete)?;

    let proof = match proof::validate(&delivery, &submission) {
        Ok(proof) => proof,
        Err(err) => {
            let reason = match &err {
                EngineError::OtpMismatch => "otp_mismatch",
                EngineError::ProofInsufficient(_) => "insufficient",
                _ => "invalid",
            };
            state
                .metrics
                .proof_rejections_total
                .with_label_values(&[reason])
                .inc();
            return Err(err);
        }
    };

    let details = proximity_flag(state, &delivery, &proof)?;

    let delivered = commit(
        state,
        delivery_id,
        delivery.status,
        Action::Complete,
        DeliveryUpdate {
            status: next,
            courier_id: None,
            failure_reason: None,
            proof: Some(proof),
            log: LogDraft {
                delivery_id,
                actor_id,
                action: LogAction::Delivered,
                details,
            },
        },
    )?;

    release_courier(state, &delivered)?;
    Ok(delivered)
}

fn fetch(state: &AppState, delivery_id: Uuid) -> Result<Delivery, EngineError> {
    state
        .store
        .delivery(delivery_id)?
        .ok_or_else(|| EngineError::NotFound(format!("delivery {delivery_id} not found")))
}

fn commit(
    state: &AppState,
    delivery_id: Uuid,
    expect: DeliveryStatus,
    action: Action,
    update: DeliveryUpdate,
) -> Result<Delivery, EngineError> {
    match state.store.update_delivery(delivery_id, expect, update)? {
        UpdateOutcome::Committed { delivery, log } => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action.as_str(), "success"])
                .inc();
            state.publish_lifecycle_event(&log);
            info!(
                delivery_id = %delivery_id,
                action = action.as_str(),
                status = ?delivery.status,
                "delivery transition committed"
            );
            Ok(delivery)
        }
        UpdateOutcome::Conflict { current } => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action.as_str(), "conflict"])
                .inc();
            Err(conflict_error(action, &current))
        }
    }
}

// A lost compare-and-swap means another writer moved the delivery first;
// report it the same way a stale precondition would have been.
fn conflict_error(action: Action, current: &Delivery) -> EngineError {
    match (action, current.status, current.courier_id) {
        (Action::Assign, DeliveryStatus::Assigned, Some(courier_id)) => {
            EngineError::AlreadyAssigned { courier_id }
        }
        _ => EngineError::InvalidTransition {
            current: current.status,
            action,
        },
    }
}

fn release_courier(state: &AppState, delivery: &Delivery) -> Result<(), EngineError> {
    if let Some(courier_id) = delivery.courier_id {
        state
            .store
            .set_courier_status(courier_id, CourierStatus::Available)?;
    }
    Ok(())
}

// GPS error margins make proximity a flag, not a gate: an out-of-range
// capture location annotates the audit entry and never blocks completion.
fn proximity_flag(
    state: &AppState,
    delivery: &Delivery,
    proof: &crate::models::proof::ProofOfDelivery,
) -> Result<Option<String>, EngineError> {
    let Some(capture) = proof.location else {
        return Ok(None);
    };
    let Some(destination) = state.store.point(delivery.destination_point_id)? else {
        return Ok(None);
    };

    let distance_m = haversine_m(&capture, &destination.location);
    if distance_m > state.config.proof_distance_flag_m {
        return Ok(Some(format!(
            "proof captured {distance_m:.0} m from destination"
        )));
    }
    Ok(None)
}
