use uuid::Uuid;

use crate::error::EngineError;
use crate::models::log::{DeliveryLog, LogAction, LogDraft};
use crate::store::Store;

/// Pure append: the only requirement is that the delivery exists.
pub fn append(
    store: &dyn Store,
    delivery_id: Uuid,
    actor_id: Option<Uuid>,
    action: LogAction,
    details: Option<String>,
) -> Result<DeliveryLog, EngineError> {
    if store.delivery(delivery_id)?.is_none() {
        return Err(EngineError::NotFound(format!(
            "delivery {delivery_id} not found"
        )));
    }

    Ok(store.append_log(LogDraft {
        delivery_id,
        actor_id,
        action,
        details,
    })?)
}

/// The delivery's full audit trail for dispute resolution, ordered by
/// `created_at` with ties broken by the store-assigned sequence number.
pub fn replay(store: &dyn Store, delivery_id: Uuid) -> Result<Vec<DeliveryLog>, EngineError> {
    if store.delivery(delivery_id)?.is_none() {
        return Err(EngineError::NotFound(format!(
            "delivery {delivery_id} not found"
        )));
    }

    let mut logs = store.logs(delivery_id)?;
    logs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
    Ok(logs)
}
