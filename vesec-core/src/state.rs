//! Shared station state
//!
//! One explicit state object owns the per-gun telemetry and the last
//! published assignment table. The composition root creates it and hands
//! clones of the locked handle to whoever needs to read it; only the
//! allocation engine writes. Display pollers read snapshots and never
//! mutate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::types::{GunId, ModuleId, VehicleStatus};

/// Telemetry last reported for one gun
#[derive(Debug, Clone, Serialize)]
pub struct GunState {
    /// Requested power (kW)
    pub demand_kw: f64,
    /// Battery state of charge (percent). Guns that have never reported
    /// stay at 0, which biases scarce modules toward them.
    pub soc_percent: f64,
    /// Vehicle-side status
    pub vehicle_status: VehicleStatus,
    /// When any field last changed
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for GunState {
    fn default() -> Self {
        Self {
            demand_kw: 0.0,
            soc_percent: 0.0,
            vehicle_status: VehicleStatus::Idle,
            last_update: None,
        }
    }
}

/// Station-wide mutable state behind the shared handle
#[derive(Debug)]
pub struct StationState {
    guns: BTreeMap<GunId, GunState>,
    /// Assignment table from the most recent recompute
    allocation: BTreeMap<GunId, Vec<ModuleId>>,
}

/// Handle passed to components by the composition root
pub type SharedState = Arc<RwLock<StationState>>;

impl StationState {
    pub fn new() -> Self {
        Self {
            guns: GunId::all().map(|gun| (gun, GunState::default())).collect(),
            allocation: GunId::all().map(|gun| (gun, Vec::new())).collect(),
        }
    }

    /// Wrap a fresh state in the shared handle
    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn set_demand(&mut self, gun: GunId, demand_kw: f64) {
        let entry = self.guns.entry(gun).or_default();
        entry.demand_kw = demand_kw;
        entry.last_update = Some(Utc::now());
    }

    pub fn set_soc(&mut self, gun: GunId, soc_percent: f64) {
        let entry = self.guns.entry(gun).or_default();
        entry.soc_percent = soc_percent;
        entry.last_update = Some(Utc::now());
    }

    pub fn set_vehicle_status(&mut self, gun: GunId, status: VehicleStatus) {
        let entry = self.guns.entry(gun).or_default();
        entry.vehicle_status = status;
        entry.last_update = Some(Utc::now());
    }

    pub fn gun(&self, gun: GunId) -> &GunState {
        // Every valid GunId is seeded at construction
        &self.guns[&gun]
    }

    /// Replace the published assignment table after a recompute
    pub fn publish_allocation(&mut self, allocation: BTreeMap<GunId, Vec<ModuleId>>) {
        self.allocation = allocation;
    }

    /// Modules last assigned to a gun, ascending
    pub fn assigned_modules(&self, gun: GunId) -> &[ModuleId] {
        self.allocation.get(&gun).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Read-only snapshot of every gun for display
    pub fn snapshot(&self) -> StationSnapshot {
        StationSnapshot {
            guns: self
                .guns
                .iter()
                .map(|(gun, state)| GunSnapshot {
                    gun_id: *gun,
                    demand_kw: state.demand_kw,
                    soc_percent: state.soc_percent,
                    vehicle_status: state.vehicle_status,
                    modules_assigned: self.assigned_modules(*gun).to_vec(),
                    last_update: state.last_update,
                })
                .collect(),
        }
    }
}

/// Point-in-time view of one gun
#[derive(Debug, Clone, Serialize)]
pub struct GunSnapshot {
    pub gun_id: GunId,
    pub demand_kw: f64,
    pub soc_percent: f64,
    pub vehicle_status: VehicleStatus,
    pub modules_assigned: Vec<ModuleId>,
    pub last_update: Option<DateTime<Utc>>,
}

/// Point-in-time view of the whole station
#[derive(Debug, Clone, Serialize)]
pub struct StationSnapshot {
    pub guns: Vec<GunSnapshot>,
}
