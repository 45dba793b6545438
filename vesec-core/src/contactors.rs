//! Contactor matrix
//!
//! One contactor per (gun, module) pair gates current between the gun and
//! that module, 6×9 in total. Applying a connection set is diff-based:
//! only contactors leaving the wanted set open and only newly wanted ones
//! close, so an unchanged assignment moves nothing. Exclusivity across guns
//! is an invariant of the assignment feeding this matrix and is not
//! re-checked here.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::commands::{CommandBus, ContactorAction, HardwareCommand};
use crate::types::{GunId, ModuleId};

/// One electrical switch between a gun and a module
#[derive(Debug)]
struct Contactor {
    /// Panel id, `gun * 100 + module`
    contactor_id: u16,
    gun_id: GunId,
    module_id: ModuleId,
    closed: bool,
}

impl Contactor {
    fn new(gun_id: GunId, module_id: ModuleId) -> Self {
        Self {
            contactor_id: gun_id.get() as u16 * 100 + module_id.get() as u16,
            gun_id,
            module_id,
            closed: false,
        }
    }

    fn close(&mut self, bus: &CommandBus) -> bool {
        if self.closed {
            return false;
        }
        bus.send(HardwareCommand::Contactor {
            gun_id: self.gun_id,
            module_id: self.module_id,
            command: ContactorAction::Close,
        });
        self.closed = true;
        info!("Closed contactor {} for gun {}", self.contactor_id, self.gun_id);
        true
    }

    fn open(&mut self, bus: &CommandBus) -> bool {
        if !self.closed {
            return false;
        }
        bus.send(HardwareCommand::Contactor {
            gun_id: self.gun_id,
            module_id: self.module_id,
            command: ContactorAction::Open,
        });
        self.closed = false;
        info!("Opened contactor {} for gun {}", self.contactor_id, self.gun_id);
        true
    }
}

/// Owner of the gun-to-module switching fabric
pub struct ContactorMatrix {
    contactors: BTreeMap<GunId, BTreeMap<ModuleId, Contactor>>,
    bus: CommandBus,
}

impl ContactorMatrix {
    /// Build the full matrix with every contactor open
    pub fn new(bus: CommandBus) -> Self {
        let contactors: BTreeMap<GunId, BTreeMap<ModuleId, Contactor>> = GunId::all()
            .map(|gun| {
                let row = ModuleId::all()
                    .map(|module| (module, Contactor::new(gun, module)))
                    .collect();
                (gun, row)
            })
            .collect();
        info!("Initialized contactor matrix for {} guns", contactors.len());
        Self { contactors, bus }
    }

    /// Converge a gun's connections to exactly `module_ids`.
    ///
    /// Opens contactors that are closed but no longer wanted, then closes
    /// the newly wanted ones. Links present in both the current and the
    /// requested set are left untouched.
    pub fn connect(&mut self, gun: GunId, module_ids: &[ModuleId]) {
        let wanted: BTreeSet<ModuleId> = module_ids.iter().copied().collect();
        let bus = self.bus.clone();

        let row = self
            .contactors
            .get_mut(&gun)
            .expect("matrix rows cover all guns");

        for (module, contactor) in row.iter_mut() {
            if contactor.closed && !wanted.contains(module) {
                contactor.open(&bus);
            }
        }
        for module in &wanted {
            if let Some(contactor) = row.get_mut(module) {
                contactor.close(&bus);
            }
        }

        info!("Gun {} connected to modules {:?}", gun, module_ids);
    }

    /// Open every contactor of a gun
    pub fn disconnect(&mut self, gun: GunId) {
        let bus = self.bus.clone();
        let row = self
            .contactors
            .get_mut(&gun)
            .expect("matrix rows cover all guns");

        let mut opened = 0;
        for contactor in row.values_mut() {
            if contactor.open(&bus) {
                opened += 1;
            }
        }
        if opened > 0 {
            info!("Disconnected gun {} from {} modules", gun, opened);
        }
    }

    /// Modules whose contactor for this gun is closed, ascending
    pub fn connected_modules(&self, gun: GunId) -> Vec<ModuleId> {
        self.contactors
            .get(&gun)
            .map(|row| {
                row.iter()
                    .filter(|(_, c)| c.closed)
                    .map(|(module, _)| *module)
                    .collect()
            })
            .unwrap_or_default()
    }
}
