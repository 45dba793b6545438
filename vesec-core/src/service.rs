//! Serialized recompute service
//!
//! Telemetry for different guns arrives concurrently, but a recompute reads
//! and rewrites the whole assignment and then actuates hardware from it, so
//! exactly one writer may run at a time. The service owns the engine on a
//! single task draining a request queue; handles are cheap clones that
//! enqueue work. Queries ride the same queue and reply over oneshot
//! channels, so a query observes every update enqueued before it.

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::alloc::{AllocationEngine, GunAllocation};
use crate::state::StationSnapshot;
use crate::telemetry::{parse_update, TelemetryUpdate};
use crate::types::{GunId, StationError};

/// Depth of the request queue
const REQUEST_QUEUE_DEPTH: usize = 64;

enum Request {
    Update(TelemetryUpdate),
    Allocation {
        gun_id: u8,
        reply: oneshot::Sender<Result<GunAllocation, StationError>>,
    },
    Snapshot {
        reply: oneshot::Sender<StationSnapshot>,
    },
    SetGunMaxPower {
        gun_id: u8,
        max_kw: f64,
    },
}

/// Spawns and addresses the single-writer allocation worker
pub struct AllocationService;

impl AllocationService {
    /// Move the engine onto its worker task and return the handle
    pub fn spawn(mut engine: AllocationEngine) -> AllocationHandle {
        let (tx, mut rx) = mpsc::channel::<Request>(REQUEST_QUEUE_DEPTH);

        tokio::spawn(async move {
            info!("Allocation service started");
            while let Some(request) = rx.recv().await {
                match request {
                    Request::Update(update) => engine.process_update(update),
                    Request::Allocation { gun_id, reply } => {
                        let result = GunId::new(gun_id).map(|gun| engine.allocation(gun));
                        let _ = reply.send(result);
                    }
                    Request::Snapshot { reply } => {
                        let _ = reply.send(engine.snapshot());
                    }
                    Request::SetGunMaxPower { gun_id, max_kw } => match GunId::new(gun_id) {
                        Ok(gun) => engine.set_gun_max_power(gun, max_kw),
                        Err(e) => warn!("Ignoring max power update: {}", e),
                    },
                }
            }
            info!("Allocation service stopped");
        });

        AllocationHandle { tx }
    }
}

/// Cloneable front door to the allocation worker
#[derive(Clone)]
pub struct AllocationHandle {
    tx: mpsc::Sender<Request>,
}

impl AllocationHandle {
    /// Enqueue a validated telemetry update
    pub async fn update(&self, update: TelemetryUpdate) -> Result<(), StationError> {
        self.tx
            .send(Request::Update(update))
            .await
            .map_err(|_| StationError::ServiceClosed)
    }

    /// Parse and enqueue a raw topic/payload pair.
    ///
    /// Malformed input is logged and dropped here; producers never see an
    /// error and the gun's prior values stay in effect.
    pub async fn ingest(&self, topic: &str, payload: &str) {
        match parse_update(topic, payload) {
            Ok(update) => {
                if self.update(update).await.is_err() {
                    warn!("Allocation service gone, dropping message on {}", topic);
                }
            }
            Err(e) => warn!("Dropping message on {}: {}", topic, e),
        }
    }

    /// Query the allocation snapshot for one gun
    pub async fn allocation(&self, gun_id: u8) -> Result<GunAllocation, StationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Allocation { gun_id, reply })
            .await
            .map_err(|_| StationError::ServiceClosed)?;
        rx.await.map_err(|_| StationError::ServiceClosed)?
    }

    /// Query the station-wide snapshot
    pub async fn snapshot(&self) -> Result<StationSnapshot, StationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Snapshot { reply })
            .await
            .map_err(|_| StationError::ServiceClosed)?;
        rx.await.map_err(|_| StationError::ServiceClosed)
    }

    /// Update a gun's power ceiling
    pub async fn set_gun_max_power(&self, gun_id: u8, max_kw: f64) -> Result<(), StationError> {
        self.tx
            .send(Request::SetGunMaxPower { gun_id, max_kw })
            .await
            .map_err(|_| StationError::ServiceClosed)
    }
}
