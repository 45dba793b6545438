//! Power module bank
//!
//! Nine identical rectifier modules, each a two-state device addressed on
//! the CAN bus by a fixed arbitration id. Activation is idempotent: a
//! repeated start or stop is a no-op and emits nothing.

use tracing::{info, warn};

use crate::commands::{CommandBus, HardwareCommand, ModuleAction};
use crate::types::{ModuleId, StationError};

/// CAN arbitration ids of the module pool, indexed by module id - 1
const ARBITRATION_IDS: [u32; 9] = [
    0x01234, 0x02345, 0x03456, 0x04567, 0x05678, 0x06789, 0x0789A, 0x089AB, 0x09ABC,
];

/// One rectifier module
#[derive(Debug)]
pub struct PowerModule {
    id: ModuleId,
    arbitration_id: u32,
    capacity_kw: f64,
    active: bool,
}

impl PowerModule {
    fn new(id: ModuleId, arbitration_id: u32, capacity_kw: f64) -> Self {
        Self {
            id,
            arbitration_id,
            capacity_kw,
            active: false,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn capacity_kw(&self) -> f64 {
        self.capacity_kw
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start the module. Returns true if a transition happened.
    fn start(&mut self, bus: &CommandBus) -> bool {
        if self.active {
            return false;
        }
        bus.send(HardwareCommand::Module {
            module_id: self.id,
            command: ModuleAction::Start,
        });
        self.active = true;
        info!("Started module {} (arb 0x{:05X})", self.id, self.arbitration_id);
        true
    }

    /// Stop the module. Returns true if a transition happened.
    fn stop(&mut self, bus: &CommandBus) -> bool {
        if !self.active {
            return false;
        }
        bus.send(HardwareCommand::Module {
            module_id: self.id,
            command: ModuleAction::Stop,
        });
        self.active = false;
        info!("Stopped module {} (arb 0x{:05X})", self.id, self.arbitration_id);
        true
    }
}

/// Owner of the module pool
pub struct ModuleBank {
    modules: Vec<PowerModule>,
    bus: CommandBus,
}

impl ModuleBank {
    /// Build the pool with a uniform per-module capacity
    pub fn new(bus: CommandBus, module_power_kw: f64) -> Self {
        let modules = ModuleId::all()
            .map(|id| {
                let arb = ARBITRATION_IDS[(id.get() - 1) as usize];
                PowerModule::new(id, arb, module_power_kw)
            })
            .collect::<Vec<_>>();
        info!("Initialized {} power modules", modules.len());
        Self { modules, bus }
    }

    fn module_mut(&mut self, id: ModuleId) -> &mut PowerModule {
        // ModuleId is validated to the pool range at construction
        &mut self.modules[(id.get() - 1) as usize]
    }

    fn module(&self, id: ModuleId) -> &PowerModule {
        &self.modules[(id.get() - 1) as usize]
    }

    /// Activate a module by raw id, skipping out-of-range ids with a log
    pub fn activate_raw(&mut self, raw_id: u8) -> Result<bool, StationError> {
        match ModuleId::new(raw_id) {
            Ok(id) => Ok(self.activate(id)),
            Err(e) => {
                warn!("Skipping activation: {}", e);
                Err(e)
            }
        }
    }

    /// Idempotent activate; true means a START command was emitted
    pub fn activate(&mut self, id: ModuleId) -> bool {
        let bus = self.bus.clone();
        self.module_mut(id).start(&bus)
    }

    /// Idempotent deactivate; true means a STOP command was emitted
    pub fn deactivate(&mut self, id: ModuleId) -> bool {
        let bus = self.bus.clone();
        self.module_mut(id).stop(&bus)
    }

    pub fn is_active(&self, id: ModuleId) -> bool {
        self.module(id).is_active()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Ids of currently active modules, ascending
    pub fn active_modules(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.id())
            .collect()
    }

    /// Rated capacity of the whole pool (kW)
    pub fn total_capacity_kw(&self) -> f64 {
        self.modules.iter().map(|m| m.capacity_kw()).sum()
    }

    /// Rated capacity of active modules only (kW)
    pub fn active_capacity_kw(&self) -> f64 {
        self.modules
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.capacity_kw())
            .sum()
    }
}
