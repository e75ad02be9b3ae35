use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::machine;
use crate::engine::queue::enqueue_delivery;
use crate::error::EngineError;
use crate::geo::haversine_m;
use crate::models::courier::{Courier, CourierStatus};
use crate::models::delivery::DeliveryStatus;
use crate::models::point::GeoPoint;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Assigned,
    Skipped,
}

/// Matches queued deliveries to couriers. Runs until the queue channel
/// closes. Racing a manual `assign` is safe: the transition's
/// compare-and-swap picks exactly one winner either way.
pub async fn run_coordinator(state: Arc<AppState>, mut assignment_rx: mpsc::Receiver<Uuid>) {
    info!("assignment coordinator started");

    while let Some(delivery_id) = assignment_rx.recv().await {
        state.metrics.deliveries_awaiting_assignment.dec();

        let start = Instant::now();
        match dispatch_delivery(state.clone(), delivery_id).await {
            Ok(outcome) => {
                let label = match outcome {
                    Outcome::Assigned => "success",
                    Outcome::Skipped => "skipped",
                };
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .assignment_latency_seconds
                    .with_label_values(&[label])
                    .observe(elapsed);
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .assignment_latency_seconds
                    .with_label_values(&["error"])
                    .observe(elapsed);
                error!(delivery_id = %delivery_id, error = %err, "failed to dispatch delivery");
            }
        }
    }

    warn!("assignment coordinator stopped: queue channel closed");
}

async fn dispatch_delivery(
    state: Arc<AppState>,
    delivery_id: Uuid,
) -> Result<Outcome, EngineError> {
    let Some(delivery) = state.store.delivery(delivery_id)? else {
        warn!(delivery_id = %delivery_id, "queued delivery no longer exists");
        return Ok(Outcome::Skipped);
    };

    // Failed or manually assigned while sitting in the queue.
    if delivery.status != DeliveryStatus::Created {
        return Ok(Outcome::Skipped);
    }

    let target_point_id = delivery
        .pickup_point_id
        .unwrap_or(delivery.destination_point_id);
    let Some(target) = state.store.point(target_point_id)? else {
        return Err(EngineError::Internal(format!(
            "delivery {delivery_id} references missing point {target_point_id}"
        )));
    };

    let candidates = state.store.available_couriers()?;
    let Some(winner) = select_courier(&candidates, &target.location) else {
        warn!(delivery_id = %delivery_id, "no available couriers; re-queueing delivery");
        sleep(Duration::from_millis(250)).await;
        enqueue_delivery(&state, delivery_id).await?;
        return Ok(Outcome::Skipped);
    };
    let winner_id = winner.id;

    match machine::assign(&state, delivery_id, winner_id, None) {
        Ok(_) => {
            state
                .store
                .set_courier_status(winner_id, CourierStatus::Busy)?;
            info!(
                delivery_id = %delivery_id,
                courier_id = %winner_id,
                "delivery assigned by coordinator"
            );
            Ok(Outcome::Assigned)
        }
        Err(EngineError::AlreadyAssigned { courier_id }) => {
            info!(
                delivery_id = %delivery_id,
                courier_id = %courier_id,
                "delivery already assigned; dropping from queue"
            );
            Ok(Outcome::Skipped)
        }
        Err(err) => Err(err),
    }
}

/// Nearest available courier to the target point; ties go to whoever has
/// been available longest, then to the smaller id for determinism.
pub fn select_courier<'a>(candidates: &'a [Courier], target: &GeoPoint) -> Option<&'a Courier> {
    candidates.iter().min_by(|a, b| {
        haversine_m(&a.location, target)
            .total_cmp(&haversine_m(&b.location, target))
            .then_with(|| a.available_since.cmp(&b.available_since))
            .then_with(|| a.id.cmp(&b.id))
    })
}
