//! Allocation engine
//!
//! Arbitrates the module pool among the guns. Every accepted demand or SOC
//! change recomputes the full assignment in three passes and then converges
//! the hardware to it:
//!
//! 1. Greedy: highest raw demand first, lowest-numbered free modules.
//! 2. Starvation rebalance: a demanding gun left empty borrows one module
//!    from the best-scoring donor (SOC-gap weighted, largest holder as
//!    fallback).
//! 3. Proportional backfill: leftover modules go to guns with unmet need,
//!    weighted toward depleted batteries.
//!
//! The apply step is idempotent end to end: module activation and contactor
//! switching are diffed against current hardware state, so replaying the
//! same inputs moves nothing. The recompute is deterministic for a given
//! input history.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::StationConfig;
use crate::contactors::ContactorMatrix;
use crate::modules::ModuleBank;
use crate::scoring::ScoringPolicy;
use crate::state::{SharedState, StationSnapshot};
use crate::telemetry::TelemetryUpdate;
use crate::types::{GunId, ModuleId, VehicleStatus};

/// Whether a gun currently has modules behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Active,
    Inactive,
}

/// Queryable per-gun allocation snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GunAllocation {
    pub gun_id: GunId,
    pub demand_kw: f64,
    pub max_allowed_kw: f64,
    pub modules_assigned: Vec<ModuleId>,
    pub total_capacity_kw: f64,
    pub module_power_kw: f64,
    pub status: AllocationStatus,
}

/// Per-gun inputs frozen at the start of one recompute
#[derive(Debug, Clone, Copy)]
struct GunInput {
    gun: GunId,
    raw_demand: f64,
    capped_demand: f64,
    soc: f64,
    need: usize,
}

/// Single writer over assignment, module bank and contactor matrix
pub struct AllocationEngine {
    config: StationConfig,
    config_path: Option<std::path::PathBuf>,
    policy: ScoringPolicy,
    state: SharedState,
    bank: ModuleBank,
    matrix: ContactorMatrix,
    assignments: BTreeMap<GunId, Vec<ModuleId>>,
}

impl AllocationEngine {
    pub fn new(
        config: StationConfig,
        policy: ScoringPolicy,
        state: SharedState,
        bank: ModuleBank,
        matrix: ContactorMatrix,
    ) -> Self {
        Self {
            config,
            config_path: None,
            policy,
            state,
            bank,
            matrix,
            assignments: GunId::all().map(|gun| (gun, Vec::new())).collect(),
        }
    }

    /// Persist configuration updates back to this file
    pub fn with_config_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Route a validated telemetry event
    pub fn process_update(&mut self, update: TelemetryUpdate) {
        match update {
            TelemetryUpdate::Demand { gun, kilowatts } => self.process_demand_change(gun, kilowatts),
            TelemetryUpdate::Soc { gun, percent } => self.process_soc_update(gun, percent),
            TelemetryUpdate::VehicleStatus { gun, status } => self.process_vehicle_status(gun, status),
        }
    }

    /// Store a demand change and recompute all assignments
    pub fn process_demand_change(&mut self, gun: GunId, demand_kw: f64) {
        info!("Processing demand change for gun {}: {} kW", gun, demand_kw);
        self.state.write().set_demand(gun, demand_kw);
        self.recompute();
    }

    /// Store an SOC report and recompute all assignments
    pub fn process_soc_update(&mut self, gun: GunId, soc_percent: f64) {
        info!("Processing SOC update for gun {}: {}%", gun, soc_percent);
        self.state.write().set_soc(gun, soc_percent);
        self.recompute();
    }

    /// Store a vehicle status report; does not affect the assignment
    pub fn process_vehicle_status(&mut self, gun: GunId, status: VehicleStatus) {
        debug!("Vehicle status for gun {}: {}", gun, status);
        self.state.write().set_vehicle_status(gun, status);
    }

    /// Update a gun's power ceiling, persist it when a path is set, and
    /// recompute with the new cap
    pub fn set_gun_max_power(&mut self, gun: GunId, max_kw: f64) {
        info!("Max power for gun {} set to {} kW", gun, max_kw);
        self.config.set_gun_max_power(gun, max_kw);
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save(path) {
                warn!("Failed to persist configuration: {}", e);
            }
        }
        self.recompute();
    }

    /// Snapshot the allocation of one gun
    pub fn allocation(&self, gun: GunId) -> GunAllocation {
        let module_power = self.config.module_power();
        let state = self.state.read();
        let gun_state = state.gun(gun);
        let modules = self.assignments.get(&gun).cloned().unwrap_or_default();

        GunAllocation {
            gun_id: gun,
            demand_kw: gun_state.demand_kw,
            max_allowed_kw: self.config.gun_max_power(gun),
            total_capacity_kw: modules.len() as f64 * module_power,
            module_power_kw: module_power,
            status: if modules.is_empty() {
                AllocationStatus::Inactive
            } else {
                AllocationStatus::Active
            },
            modules_assigned: modules,
        }
    }

    /// Snapshot every gun for display
    pub fn snapshot(&self) -> StationSnapshot {
        self.state.read().snapshot()
    }

    /// Current assignment table
    pub fn assignments(&self) -> &BTreeMap<GunId, Vec<ModuleId>> {
        &self.assignments
    }

    pub fn bank(&self) -> &ModuleBank {
        &self.bank
    }

    pub fn matrix(&self) -> &ContactorMatrix {
        &self.matrix
    }

    /// Recompute the full assignment and converge the hardware to it
    fn recompute(&mut self) {
        let module_power = self.config.module_power();
        let pool_size = self.bank.module_count();
        let inputs = self.gather_inputs(module_power, pool_size);

        let mut next: BTreeMap<GunId, Vec<ModuleId>> =
            GunId::all().map(|gun| (gun, Vec::new())).collect();
        let mut free: BTreeSet<ModuleId> = ModuleId::all().collect();

        // Greedy pass: raw demand descending, gun id breaking ties
        let mut order = inputs.clone();
        order.sort_by(|a, b| {
            b.raw_demand
                .partial_cmp(&a.raw_demand)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.gun.cmp(&b.gun))
        });

        for input in &order {
            if input.need == 0 {
                continue;
            }
            let granted: Vec<ModuleId> = free.iter().copied().take(input.need).collect();
            for id in &granted {
                free.remove(id);
            }
            if granted.len() < input.need {
                debug!(
                    "Gun {} received {}/{} modules, pool exhausted",
                    input.gun,
                    granted.len(),
                    input.need
                );
            }
            info!(
                "Assigned {} modules to gun {} (demand {} kW)",
                granted.len(),
                input.gun,
                input.raw_demand
            );
            next.get_mut(&input.gun).expect("all guns seeded").extend(granted);
        }

        self.rebalance_starved(&inputs, &mut next);
        self.backfill(&inputs, &mut next, &mut free, pool_size);

        self.apply(next);
    }

    /// Freeze demand, SOC, cap and need per gun, in ascending gun id order
    fn gather_inputs(&self, module_power: f64, pool_size: usize) -> Vec<GunInput> {
        let state = self.state.read();
        GunId::all()
            .map(|gun| {
                let gun_state = state.gun(gun);
                let capped = gun_state.demand_kw.min(self.config.gun_max_power(gun));
                let need = if capped > 0.0 {
                    ((capped / module_power).ceil() as usize).clamp(1, pool_size)
                } else {
                    0
                };
                GunInput {
                    gun,
                    raw_demand: gun_state.demand_kw,
                    capped_demand: capped,
                    soc: gun_state.soc_percent,
                    need,
                }
            })
            .collect()
    }

    /// Starvation rebalance: every demanding gun left with nothing borrows
    /// exactly one module from a donor holding more than one.
    ///
    /// Donors scoring on the SOC gap win first; otherwise the largest
    /// holder donates. Starved guns are served in ascending gun id order so
    /// replays stay deterministic. Module lists are kept ascending, so the
    /// donated module is the donor's highest-numbered one.
    fn rebalance_starved(
        &self,
        inputs: &[GunInput],
        next: &mut BTreeMap<GunId, Vec<ModuleId>>,
    ) {
        for requester in inputs {
            if requester.capped_demand <= 0.0 || !next[&requester.gun].is_empty() {
                continue;
            }

            let mut best: Option<(f64, GunId)> = None;
            for donor in inputs {
                if donor.gun == requester.gun {
                    continue;
                }
                let count = next[&donor.gun].len();
                if count <= 1 {
                    continue;
                }
                if let Some(score) = self.policy.donor_score(count, donor.soc, requester.soc) {
                    if best.map_or(true, |(s, _)| score > s) {
                        best = Some((score, donor.gun));
                    }
                }
            }

            let donor = best.map(|(_, gun)| gun).or_else(|| {
                let mut largest: Option<(usize, GunId)> = None;
                for donor in inputs {
                    if donor.gun == requester.gun {
                        continue;
                    }
                    let count = next[&donor.gun].len();
                    if count > 1 && largest.map_or(true, |(c, _)| count > c) {
                        largest = Some((count, donor.gun));
                    }
                }
                largest.map(|(_, gun)| gun)
            });

            match donor {
                Some(donor) => {
                    let donated = next
                        .get_mut(&donor)
                        .expect("all guns seeded")
                        .pop()
                        .expect("donor holds more than one module");
                    next.get_mut(&requester.gun).expect("all guns seeded").push(donated);
                    info!(
                        "Rebalanced module {} from gun {} to starved gun {}",
                        donated, donor, requester.gun
                    );
                }
                None => warn!("Gun {} left unserved this cycle, no donor available", requester.gun),
            }
        }
    }

    /// Proportional backfill: distribute modules still unassigned among
    /// guns with unmet need, weighted by demand and inverted SOC.
    ///
    /// Target shares are not reconciled against the pool; distribution
    /// order is authoritative. Guns are served in descending weight order
    /// (ties by ascending gun id), modules handed out in ascending module
    /// id, and each grant is capped by the gun's unmet need so the
    /// count-never-exceeds-need invariant holds.
    fn backfill(
        &self,
        inputs: &[GunInput],
        next: &mut BTreeMap<GunId, Vec<ModuleId>>,
        free: &mut BTreeSet<ModuleId>,
        pool_size: usize,
    ) {
        if free.is_empty() {
            return;
        }

        let demanding = inputs.iter().filter(|i| i.capped_demand > 0.0).count();
        let mut qualifying: Vec<(f64, GunInput)> = inputs
            .iter()
            .filter(|i| i.need > next[&i.gun].len())
            .map(|i| (self.policy.backfill_weight(i.capped_demand, i.soc), *i))
            .collect();
        if qualifying.is_empty() {
            return;
        }

        let total: f64 = qualifying.iter().map(|(weight, _)| weight).sum();
        if total <= 0.0 {
            return;
        }
        qualifying.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.gun.cmp(&b.1.gun))
        });

        let spare = pool_size.saturating_sub(demanding);

        for (weight, input) in qualifying {
            if free.is_empty() {
                break;
            }
            let share = ((weight / total * spare as f64 + 1.0).round() as usize).clamp(1, pool_size);
            let unmet = input.need - next[&input.gun].len();
            let granted: Vec<ModuleId> = free.iter().copied().take(share.min(unmet)).collect();
            for id in &granted {
                free.remove(id);
            }
            if !granted.is_empty() {
                debug!(
                    "Backfilled gun {} with modules {:?} (weight {:.2})",
                    input.gun, granted, weight
                );
                next.get_mut(&input.gun).expect("all guns seeded").extend(granted);
            }
        }
    }

    /// Converge module activation and contactor topology to the new
    /// assignment, then publish it
    fn apply(&mut self, mut next: BTreeMap<GunId, Vec<ModuleId>>) {
        for modules in next.values_mut() {
            modules.sort_unstable();
        }

        let should_be_active: BTreeSet<ModuleId> = next.values().flatten().copied().collect();

        for id in ModuleId::all() {
            if should_be_active.contains(&id) {
                self.bank.activate(id);
            } else {
                self.bank.deactivate(id);
            }
        }

        for (gun, modules) in &next {
            if modules.is_empty() {
                self.matrix.disconnect(*gun);
            } else {
                self.matrix.connect(*gun, modules);
            }
        }

        self.assignments = next;
        self.state.write().publish_allocation(self.assignments.clone());
        debug!("Active capacity now {} kW", self.bank.active_capacity_kw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandBus, HardwareCommand};
    use crate::state::StationState;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn engine() -> (AllocationEngine, UnboundedReceiver<HardwareCommand>) {
        let (bus, rx) = CommandBus::channel();
        let state = StationState::shared();
        let bank = ModuleBank::new(bus.clone(), 40.0);
        let matrix = ContactorMatrix::new(bus);
        let engine = AllocationEngine::new(
            StationConfig::default(),
            ScoringPolicy::default(),
            state,
            bank,
            matrix,
        );
        (engine, rx)
    }

    fn gun(id: u8) -> GunId {
        GunId::new(id).unwrap()
    }

    fn modules(ids: &[u8]) -> Vec<ModuleId> {
        ids.iter().map(|&id| ModuleId::new(id).unwrap()).collect()
    }

    fn drain(rx: &mut UnboundedReceiver<HardwareCommand>) -> Vec<HardwareCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    fn assert_invariants(engine: &AllocationEngine) {
        let mut seen = BTreeSet::new();
        let mut total = 0;
        for (g, mods) in engine.assignments() {
            for m in mods {
                assert!(seen.insert(*m), "module {} assigned to two guns (one is {})", m, g);
                total += 1;
            }
        }
        assert!(total <= 9, "more modules assigned than exist: {}", total);
    }

    #[test]
    fn test_single_gun_gets_exact_need() {
        let (mut engine, _rx) = engine();

        engine.process_demand_change(gun(1), 150.0);

        // 150 kW at 40 kW per module needs 4
        assert_eq!(engine.assignments()[&gun(1)], modules(&[1, 2, 3, 4]));
        for g in 2..=6 {
            assert!(engine.assignments()[&gun(g)].is_empty());
        }
        assert_eq!(engine.bank().active_modules(), modules(&[1, 2, 3, 4]));
        assert_eq!(engine.bank().active_capacity_kw(), 160.0);
        assert_eq!(engine.matrix().connected_modules(gun(1)), modules(&[1, 2, 3, 4]));
        assert_invariants(&engine);
    }

    #[test]
    fn test_allocation_snapshot_fields() {
        let (mut engine, _rx) = engine();

        engine.process_demand_change(gun(1), 150.0);
        let allocation = engine.allocation(gun(1));

        assert_eq!(allocation.gun_id, gun(1));
        assert_eq!(allocation.demand_kw, 150.0);
        assert_eq!(allocation.max_allowed_kw, 240.0);
        assert_eq!(allocation.modules_assigned, modules(&[1, 2, 3, 4]));
        assert_eq!(allocation.total_capacity_kw, 160.0);
        assert_eq!(allocation.module_power_kw, 40.0);
        assert_eq!(allocation.status, AllocationStatus::Active);

        let idle = engine.allocation(gun(5));
        assert_eq!(idle.status, AllocationStatus::Inactive);
        assert!(idle.modules_assigned.is_empty());
        assert_eq!(idle.total_capacity_kw, 0.0);
    }

    #[test]
    fn test_demand_capped_at_gun_max() {
        let (mut engine, _rx) = engine();

        // 300 kW raw is capped at 240, which sizes to 6 modules
        engine.process_demand_change(gun(2), 300.0);

        assert_eq!(engine.assignments()[&gun(2)].len(), 6);
        let allocation = engine.allocation(gun(2));
        assert_eq!(allocation.demand_kw, 300.0);
        assert_eq!(allocation.total_capacity_kw, 240.0);
        assert_invariants(&engine);
    }

    #[test]
    fn test_two_guns_no_contention() {
        let (mut engine, _rx) = engine();

        engine.process_demand_change(gun(1), 360.0);
        engine.process_demand_change(gun(2), 40.0);

        // Gun 1 capped to 240 takes 6, gun 2 takes the next free module
        assert_eq!(engine.assignments()[&gun(1)], modules(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(engine.assignments()[&gun(2)], modules(&[7]));
        assert_eq!(engine.bank().active_modules().len(), 7);
        assert_invariants(&engine);
    }

    #[test]
    fn test_starvation_rebalance_on_soc_gap() {
        let (mut engine, _rx) = engine();

        engine.process_soc_update(gun(1), 90.0);
        engine.process_soc_update(gun(2), 20.0);
        engine.process_soc_update(gun(3), 50.0);

        // Greedy order: gun 3 (240 kW, 6 modules), gun 1 (120 kW, 3
        // modules), gun 2 (40 kW) starves on the exhausted pool
        engine.process_demand_change(gun(3), 240.0);
        engine.process_demand_change(gun(1), 120.0);
        engine.process_demand_change(gun(2), 40.0);

        // Gun 1 (SOC 90, 3 modules) outscores gun 3 (SOC 50, 6 modules):
        // 3 * 0.70 = 2.1 vs 6 * 0.30 = 1.8; it donates its highest module
        assert_eq!(engine.assignments()[&gun(1)], modules(&[7, 8]));
        assert_eq!(engine.assignments()[&gun(2)], modules(&[9]));
        assert_eq!(engine.assignments()[&gun(3)], modules(&[1, 2, 3, 4, 5, 6]));
        assert_invariants(&engine);
    }

    #[test]
    fn test_rebalance_falls_back_to_largest_holder() {
        let (mut engine, _rx) = engine();

        // Equal SOC everywhere: no donor clears the gap threshold
        engine.process_soc_update(gun(1), 50.0);
        engine.process_soc_update(gun(2), 50.0);
        engine.process_soc_update(gun(3), 50.0);

        engine.process_demand_change(gun(1), 240.0);
        engine.process_demand_change(gun(2), 120.0);
        engine.process_demand_change(gun(3), 40.0);

        // Gun 1 holds 6, gun 2 holds 3, pool is empty for gun 3; the
        // largest holder donates
        assert_eq!(engine.assignments()[&gun(1)], modules(&[1, 2, 3, 4, 5]));
        assert_eq!(engine.assignments()[&gun(2)], modules(&[7, 8, 9]));
        assert_eq!(engine.assignments()[&gun(3)], modules(&[6]));
        assert_invariants(&engine);
    }

    #[test]
    fn test_zero_demand_releases_everything() {
        let (mut engine, mut rx) = engine();

        engine.process_demand_change(gun(1), 150.0);
        drain(&mut rx);

        engine.process_demand_change(gun(1), 0.0);

        assert!(engine.assignments()[&gun(1)].is_empty());
        assert!(engine.bank().active_modules().is_empty());
        assert!(engine.matrix().connected_modules(gun(1)).is_empty());
        assert_eq!(engine.allocation(gun(1)).status, AllocationStatus::Inactive);

        // 4 STOPs and 4 OPENs, nothing else
        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 8);
    }

    #[test]
    fn test_idempotent_replay_issues_no_commands() {
        let (mut engine, mut rx) = engine();

        engine.process_demand_change(gun(1), 150.0);
        engine.process_demand_change(gun(4), 80.0);
        let before = engine.assignments().clone();
        drain(&mut rx);

        engine.process_demand_change(gun(1), 150.0);

        assert_eq!(engine.assignments(), &before);
        assert!(drain(&mut rx).is_empty(), "unchanged assignment must move no hardware");
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let script = |engine: &mut AllocationEngine| {
            engine.process_soc_update(gun(1), 80.0);
            engine.process_soc_update(gun(2), 15.0);
            engine.process_demand_change(gun(1), 200.0);
            engine.process_demand_change(gun(2), 200.0);
            engine.process_demand_change(gun(3), 120.0);
            engine.process_demand_change(gun(4), 40.0);
            engine.process_demand_change(gun(2), 80.0);
        };

        let (mut a, _rx_a) = engine();
        let (mut b, _rx_b) = engine();
        script(&mut a);
        script(&mut b);

        assert_eq!(a.assignments(), b.assignments());
        assert_invariants(&a);
    }

    #[test]
    fn test_contention_keeps_invariants() {
        let (mut engine, _rx) = engine();

        engine.process_soc_update(gun(1), 95.0);
        engine.process_soc_update(gun(2), 10.0);
        engine.process_soc_update(gun(5), 60.0);

        // Total need far beyond the pool
        engine.process_demand_change(gun(1), 240.0);
        engine.process_demand_change(gun(2), 240.0);
        engine.process_demand_change(gun(3), 240.0);
        engine.process_demand_change(gun(4), 120.0);
        engine.process_demand_change(gun(5), 80.0);
        engine.process_demand_change(gun(6), 40.0);
        assert_invariants(&engine);

        // Every demanding gun ends up served once rebalance has run
        for g in GunId::all() {
            assert!(
                !engine.assignments()[&g].is_empty(),
                "gun {} left unserved with donors available",
                g
            );
        }

        // Releasing everything returns the pool
        for g in 1..=6 {
            engine.process_demand_change(gun(g), 0.0);
        }
        assert!(engine.bank().active_modules().is_empty());
        assert_invariants(&engine);
    }

    #[test]
    fn test_soc_change_triggers_recompute() {
        let (mut engine, mut rx) = engine();

        engine.process_soc_update(gun(1), 90.0);
        engine.process_soc_update(gun(2), 60.0);
        engine.process_demand_change(gun(3), 240.0);
        engine.process_demand_change(gun(1), 120.0);
        engine.process_demand_change(gun(2), 40.0);

        // Gap 90-60 = 30 > 20: gun 1 donates to gun 2
        assert_eq!(engine.assignments()[&gun(2)], modules(&[9]));
        drain(&mut rx);

        // Raising gun 2's SOC above the gap wipes the donation criterion;
        // the next recompute re-runs from scratch and the fallback donor
        // (largest holder, gun 3) serves it instead
        engine.process_soc_update(gun(2), 85.0);
        assert_eq!(engine.assignments()[&gun(2)], modules(&[6]));
        assert_invariants(&engine);
    }

    #[test]
    fn test_vehicle_status_does_not_recompute() {
        let (mut engine, mut rx) = engine();

        engine.process_demand_change(gun(1), 150.0);
        drain(&mut rx);

        engine.process_vehicle_status(gun(1), VehicleStatus::Charging);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(engine.snapshot().guns[0].vehicle_status, VehicleStatus::Charging);
    }

    #[test]
    fn test_backfill_distributes_leftovers_by_weight() {
        let (engine, _rx) = engine();

        // Hand-built mid-recompute state: guns 1 and 2 each hold one of
        // their three needed modules, 8 and 9 are still free
        let inputs = vec![
            GunInput {
                gun: gun(1),
                raw_demand: 120.0,
                capped_demand: 120.0,
                soc: 90.0,
                need: 3,
            },
            GunInput {
                gun: gun(2),
                raw_demand: 120.0,
                capped_demand: 120.0,
                soc: 10.0,
                need: 3,
            },
        ];
        let mut next: BTreeMap<GunId, Vec<ModuleId>> =
            GunId::all().map(|g| (g, Vec::new())).collect();
        next.insert(gun(1), modules(&[1]));
        next.insert(gun(2), modules(&[2]));
        let mut free: BTreeSet<ModuleId> = modules(&[8, 9]).into_iter().collect();

        engine.backfill(&inputs, &mut next, &mut free, 9);

        // Gun 2 (lower SOC, higher weight) is served first and its share
        // covers both leftovers; gun 1 finds the pool empty
        assert_eq!(next[&gun(2)], modules(&[2, 8, 9]));
        assert_eq!(next[&gun(1)], modules(&[1]));
        assert!(free.is_empty());
    }

    #[test]
    fn test_backfill_respects_unmet_need_cap() {
        let (engine, _rx) = engine();

        // One gun short a single module must not swallow the whole pool
        let inputs = vec![GunInput {
            gun: gun(4),
            raw_demand: 80.0,
            capped_demand: 80.0,
            soc: 0.0,
            need: 2,
        }];
        let mut next: BTreeMap<GunId, Vec<ModuleId>> =
            GunId::all().map(|g| (g, Vec::new())).collect();
        next.insert(gun(4), modules(&[1]));
        let mut free: BTreeSet<ModuleId> = modules(&[5, 6, 7]).into_iter().collect();

        engine.backfill(&inputs, &mut next, &mut free, 9);

        assert_eq!(next[&gun(4)], modules(&[1, 5]));
        assert_eq!(free.len(), 2);
    }
}
