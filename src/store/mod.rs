pub mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::models::courier::{Courier, CourierStatus};
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::log::{DeliveryLog, LogDraft};
use crate::models::point::{DeliveryPoint, GeoPoint};
use crate::models::proof::ProofOfDelivery;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or transaction failure. Retryable by the caller; the
    /// engine itself never retries.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub enum PointResolution {
    Created(DeliveryPoint),
    Reused(DeliveryPoint),
}

/// Field changes applied together with a status compare-and-swap. Only
/// `Some` fields are written.
#[derive(Debug, Clone)]
pub struct DeliveryUpdate {
    pub status: DeliveryStatus,
    pub courier_id: Option<Uuid>,
    pub failure_reason: Option<String>,
    pub proof: Option<ProofOfDelivery>,
    pub log: LogDraft,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Committed { delivery: Delivery, log: DeliveryLog },
    /// The precondition status no longer held; `current` is the record as
    /// the store saw it. Nothing was written.
    Conflict { current: Delivery },
}

#[derive(Debug, Clone, Copy)]
pub struct Counts {
    pub deliveries: usize,
    pub points: usize,
    pub couriers: usize,
    pub logs: usize,
}

/// Repository seam over the durable store. Every mutating method is a
/// single atomic transaction; reads may be eventually consistent.
pub trait Store: Send + Sync {
    /// Atomic match-or-create: reuse a point within `tolerance_m` of the
    /// candidate (incrementing its usage count) or insert the candidate.
    fn resolve_point(
        &self,
        candidate: DeliveryPoint,
        tolerance_m: f64,
    ) -> StoreResult<PointResolution>;
    fn point(&self, id: Uuid) -> StoreResult<Option<DeliveryPoint>>;

    /// Insert a new delivery together with its "created" log entry.
    fn insert_delivery(&self, delivery: Delivery, log: LogDraft) -> StoreResult<DeliveryLog>;
    fn delivery(&self, id: Uuid) -> StoreResult<Option<Delivery>>;
    /// Update-with-precondition: commits `update` (including its log
    /// entry, and proof if present) only while `status == expect`.
    fn update_delivery(
        &self,
        id: Uuid,
        expect: DeliveryStatus,
        update: DeliveryUpdate,
    ) -> StoreResult<UpdateOutcome>;
    fn proof(&self, delivery_id: Uuid) -> StoreResult<Option<ProofOfDelivery>>;

    fn append_log(&self, draft: LogDraft) -> StoreResult<DeliveryLog>;
    /// All log entries for a delivery, in insertion order.
    fn logs(&self, delivery_id: Uuid) -> StoreResult<Vec<DeliveryLog>>;

    fn upsert_courier(&self, courier: Courier) -> StoreResult<()>;
    fn courier(&self, id: Uuid) -> StoreResult<Option<Courier>>;
    fn list_couriers(&self) -> StoreResult<Vec<Courier>>;
    fn available_couriers(&self) -> StoreResult<Vec<Courier>>;
    fn set_courier_location(&self, id: Uuid, location: GeoPoint) -> StoreResult<Option<Courier>>;
    fn set_courier_status(&self, id: Uuid, status: CourierStatus) -> StoreResult<Option<Courier>>;

    fn counts(&self) -> StoreResult<Counts>;
}
