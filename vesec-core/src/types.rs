//! Core types for the VESEC power cabinet

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of charging guns on the cabinet
pub const GUN_COUNT: u8 = 6;

/// Number of power modules in the shared pool
pub const MODULE_COUNT: u8 = 9;

/// Compiled default per-gun power ceiling (kW)
pub const DEFAULT_GUN_MAX_POWER_KW: f64 = 240.0;

/// Compiled default per-module capacity (kW)
pub const DEFAULT_MODULE_POWER_KW: f64 = 40.0;

/// Errors raised by the cabinet core.
///
/// None of these are fatal: the service layer logs them and keeps running,
/// so telemetry producers never see a propagated failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("invalid gun id {0} (expected 1..={GUN_COUNT})")]
    InvalidGun(u8),

    #[error("invalid module id {0} (expected 1..={MODULE_COUNT})")]
    InvalidModule(u8),

    #[error("malformed topic \"{0}\"")]
    MalformedTopic(String),

    #[error("malformed {kind} payload \"{value}\"")]
    MalformedPayload { kind: &'static str, value: String },

    #[error("allocation service is not running")]
    ServiceClosed,
}

/// Identifier of a charging gun, validated to 1..=[`GUN_COUNT`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GunId(u8);

impl GunId {
    pub fn new(id: u8) -> Result<Self, StationError> {
        if (1..=GUN_COUNT).contains(&id) {
            Ok(Self(id))
        } else {
            Err(StationError::InvalidGun(id))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Iterate all guns in ascending id order
    pub fn all() -> impl Iterator<Item = GunId> {
        (1..=GUN_COUNT).map(GunId)
    }
}

impl std::fmt::Display for GunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a power module, validated to 1..=[`MODULE_COUNT`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(u8);

impl ModuleId {
    pub fn new(id: u8) -> Result<Self, StationError> {
        if (1..=MODULE_COUNT).contains(&id) {
            Ok(Self(id))
        } else {
            Err(StationError::InvalidModule(id))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Iterate all modules in ascending id order
    pub fn all() -> impl Iterator<Item = ModuleId> {
        (1..=MODULE_COUNT).map(ModuleId)
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vehicle-side status reported per gun
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Idle,
    Connected,
    Charging,
    Complete,
    Fault,
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VehicleStatus::Idle => write!(f, "idle"),
            VehicleStatus::Connected => write!(f, "connected"),
            VehicleStatus::Charging => write!(f, "charging"),
            VehicleStatus::Complete => write!(f, "complete"),
            VehicleStatus::Fault => write!(f, "fault"),
        }
    }
}

impl std::str::FromStr for VehicleStatus {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(VehicleStatus::Idle),
            "connected" => Ok(VehicleStatus::Connected),
            "charging" => Ok(VehicleStatus::Charging),
            "complete" => Ok(VehicleStatus::Complete),
            "fault" => Ok(VehicleStatus::Fault),
            other => Err(StationError::MalformedPayload {
                kind: "vehicle_status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gun_id_range() {
        assert!(GunId::new(1).is_ok());
        assert!(GunId::new(6).is_ok());
        assert_eq!(GunId::new(0), Err(StationError::InvalidGun(0)));
        assert_eq!(GunId::new(7), Err(StationError::InvalidGun(7)));
    }

    #[test]
    fn test_module_id_range() {
        assert!(ModuleId::new(1).is_ok());
        assert!(ModuleId::new(9).is_ok());
        assert_eq!(ModuleId::new(0), Err(StationError::InvalidModule(0)));
        assert_eq!(ModuleId::new(10), Err(StationError::InvalidModule(10)));
    }

    #[test]
    fn test_iterators_cover_pool() {
        assert_eq!(GunId::all().count(), GUN_COUNT as usize);
        assert_eq!(ModuleId::all().count(), MODULE_COUNT as usize);
        assert_eq!(ModuleId::all().next().unwrap().get(), 1);
        assert_eq!(ModuleId::all().last().unwrap().get(), 9);
    }

    #[test]
    fn test_vehicle_status_parse() {
        assert_eq!("charging".parse::<VehicleStatus>(), Ok(VehicleStatus::Charging));
        assert!("plugged".parse::<VehicleStatus>().is_err());
    }
}
