use uuid::Uuid;

use crate::error::EngineError;
use crate::state::AppState;

pub async fn enqueue_delivery(state: &AppState, delivery_id: Uuid) -> Result<(), EngineError> {
    state
        .assignment_tx
        .send(delivery_id)
        .await
        .map_err(|err| EngineError::Internal(format!("assignment queue send failed: {err}")))?;

    state.metrics.deliveries_awaiting_assignment.inc();
    Ok(())
}
