use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::models::log::DeliveryLog;
use crate::observability::metrics::Metrics;
use crate::store::memory::MemoryStore;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub assignment_tx: mpsc::Sender<Uuid>,
    pub lifecycle_events_tx: broadcast::Sender<DeliveryLog>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> (Self, mpsc::Receiver<Uuid>) {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(store: Arc<dyn Store>, config: Config) -> (Self, mpsc::Receiver<Uuid>) {
        let (assignment_tx, assignment_rx) = mpsc::channel(config.assignment_queue_size);
        let (lifecycle_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                store,
                config,
                assignment_tx,
                lifecycle_events_tx,
                metrics: Metrics::new(),
            },
            assignment_rx,
        )
    }

    /// Best-effort fan-out of a committed log entry to websocket
    /// subscribers; send errors just mean nobody is listening.
    pub fn publish_lifecycle_event(&self, log: &DeliveryLog) {
        let _ = self.lifecycle_events_tx.send(log.clone());
    }
}
