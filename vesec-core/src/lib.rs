//! VESEC Power Cabinet Core
//!
//! Arbitration of a shared power module pool among the charging guns of a
//! modular DC fast-charging cabinet. Telemetry (demand, SOC) flows in, the
//! allocation engine recomputes the gun-to-module assignment, and the
//! module bank and contactor matrix converge the hardware to it.

pub mod alloc;
pub mod commands;
pub mod config;
pub mod contactors;
pub mod modules;
pub mod scoring;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod types;

pub use alloc::{AllocationEngine, AllocationStatus, GunAllocation};
pub use commands::{CommandBus, ContactorAction, HardwareCommand, ModuleAction};
pub use config::StationConfig;
pub use contactors::ContactorMatrix;
pub use modules::{ModuleBank, PowerModule};
pub use scoring::ScoringPolicy;
pub use service::{AllocationHandle, AllocationService};
pub use state::{SharedState, StationSnapshot, StationState};
pub use telemetry::{parse_update, TelemetryUpdate};
pub use types::{GunId, ModuleId, StationError, VehicleStatus, GUN_COUNT, MODULE_COUNT};
