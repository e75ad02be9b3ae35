use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::geo::haversine_m;
use crate::models::courier::{Courier, CourierStatus};
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::log::{DeliveryLog, LogDraft};
use crate::models::point::{DeliveryPoint, GeoPoint};
use crate::models::proof::ProofOfDelivery;
use crate::store::{
    Counts, DeliveryUpdate, PointResolution, Store, StoreError, StoreResult, UpdateOutcome,
};

/// In-memory store backing the binary and the test suite. Per-delivery
/// atomicity comes from holding the delivery's map entry across the
/// precondition check, mutation and log append; point resolution is
/// serialized through a dedicated upsert lock so concurrent resolves for
/// the same coordinate cluster cannot create duplicates.
pub struct MemoryStore {
    points: DashMap<Uuid, DeliveryPoint>,
    point_upsert: Mutex<()>,
    deliveries: DashMap<Uuid, Delivery>,
    proofs: DashMap<Uuid, ProofOfDelivery>,
    logs: DashMap<Uuid, Vec<DeliveryLog>>,
    couriers: DashMap<Uuid, Courier>,
    log_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            points: DashMap::new(),
            point_upsert: Mutex::new(()),
            deliveries: DashMap::new(),
            proofs: DashMap::new(),
            logs: DashMap::new(),
            couriers: DashMap::new(),
            log_seq: AtomicU64::new(0),
        }
    }

    fn push_log(&self, draft: LogDraft) -> DeliveryLog {
        let log = DeliveryLog {
            id: Uuid::new_v4(),
            delivery_id: draft.delivery_id,
            actor_id: draft.actor_id,
            action: draft.action,
            details: draft.details,
            seq: self.log_seq.fetch_add(1, Ordering::Relaxed),
            created_at: Utc::now(),
        };
        self.logs
            .entry(draft.delivery_id)
            .or_default()
            .push(log.clone());
        log
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn resolve_point(
        &self,
        candidate: DeliveryPoint,
        tolerance_m: f64,
    ) -> StoreResult<PointResolution> {
        let _guard = self
            .point_upsert
            .lock()
            .map_err(|_| StoreError::Unavailable("point upsert lock poisoned".to_string()))?;

        let matched = self
            .points
            .iter()
            .find(|entry| haversine_m(&entry.value().location, &candidate.location) < tolerance_m)
            .map(|entry| *entry.key());

        if let Some(id) = matched {
            if let Some(mut point) = self.points.get_mut(&id) {
                point.usage_count += 1;
                return Ok(PointResolution::Reused(point.clone()));
            }
        }

        self.points.insert(candidate.id, candidate.clone());
        Ok(PointResolution::Created(candidate))
    }

    fn point(&self, id: Uuid) -> StoreResult<Option<DeliveryPoint>> {
        Ok(self.points.get(&id).map(|entry| entry.value().clone()))
    }

    fn insert_delivery(&self, delivery: Delivery, log: LogDraft) -> StoreResult<DeliveryLog> {
        self.deliveries.insert(delivery.id, delivery);
        Ok(self.push_log(log))
    }

    fn delivery(&self, id: Uuid) -> StoreResult<Option<Delivery>> {
        Ok(self.deliveries.get(&id).map(|entry| entry.value().clone()))
    }

    fn update_delivery(
        &self,
        id: Uuid,
        expect: DeliveryStatus,
        update: DeliveryUpdate,
    ) -> StoreResult<UpdateOutcome> {
        // The entry guard is held across check, mutation and log append;
        // racing updates for the same delivery serialize here.
        let mut entry = self
            .deliveries
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("delivery {id}")))?;

        if entry.status != expect {
            return Ok(UpdateOutcome::Conflict {
                current: entry.value().clone(),
            });
        }

        entry.status = update.status;
        if let Some(courier_id) = update.courier_id {
            entry.courier_id = Some(courier_id);
        }
        if let Some(reason) = update.failure_reason {
            entry.failure_reason = Some(reason);
        }
        entry.updated_at = Utc::now();

        if let Some(proof) = update.proof {
            self.proofs.insert(id, proof);
        }

        let log = self.push_log(update.log);
        Ok(UpdateOutcome::Committed {
            delivery: entry.value().clone(),
            log,
        })
    }

    fn proof(&self, delivery_id: Uuid) -> StoreResult<Option<ProofOfDelivery>> {
        Ok(self
            .proofs
            .get(&delivery_id)
            .map(|entry| entry.value().clone()))
    }

    fn append_log(&self, draft: LogDraft) -> StoreResult<DeliveryLog> {
        if !self.deliveries.contains_key(&draft.delivery_id) {
            return Err(StoreError::NotFound(format!(
                "delivery {}",
                draft.delivery_id
            )));
        }
        Ok(self.push_log(draft))
    }

    fn logs(&self, delivery_id: Uuid) -> StoreResult<Vec<DeliveryLog>> {
        Ok(self
            .logs
            .get(&delivery_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    fn upsert_courier(&self, courier: Courier) -> StoreResult<()> {
        self.couriers.insert(courier.id, courier);
        Ok(())
    }

    fn courier(&self, id: Uuid) -> StoreResult<Option<Courier>> {
        Ok(self.couriers.get(&id).map(|entry| entry.value().clone()))
    }

    fn list_couriers(&self) -> StoreResult<Vec<Courier>> {
        Ok(self
            .couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn available_couriers(&self) -> StoreResult<Vec<Courier>> {
        Ok(self
            .couriers
            .iter()
            .filter(|entry| entry.value().status == CourierStatus::Available)
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn set_courier_location(&self, id: Uuid, location: GeoPoint) -> StoreResult<Option<Courier>> {
        Ok(self.couriers.get_mut(&id).map(|mut courier| {
            courier.location = location;
            courier.updated_at = Utc::now();
            courier.clone()
        }))
    }

    fn set_courier_status(&self, id: Uuid, status: CourierStatus) -> StoreResult<Option<Courier>> {
        Ok(self.couriers.get_mut(&id).map(|mut courier| {
            let now = Utc::now();
            if status == CourierStatus::Available && courier.status != CourierStatus::Available {
                courier.available_since = now;
            }
            courier.status = status;
            courier.updated_at = now;
            courier.clone()
        }))
    }

    fn counts(&self) -> StoreResult<Counts> {
        Ok(Counts {
            deliveries: self.deliveries.len(),
            points: self.points.len(),
            couriers: self.couriers.len(),
            logs: self.logs.iter().map(|entry| entry.value().len()).sum(),
        })
    }
}
