//! Station configuration
//!
//! Power limits live in a small JSON file next to the process. Every read
//! path degrades to compiled defaults: a missing file is created with
//! defaults, a corrupt file is logged and ignored, and out-of-range stored
//! values fall back per key. Allocation never stalls on configuration.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{GunId, DEFAULT_GUN_MAX_POWER_KW, DEFAULT_MODULE_POWER_KW};

/// Per-station power limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Maximum deliverable power per gun (kW), keyed by gun id
    #[serde(default)]
    gun_max_power_kw: BTreeMap<u8, f64>,

    /// Rated capacity of a single power module (kW)
    #[serde(default = "default_module_power")]
    module_power_kw: f64,
}

fn default_module_power() -> f64 {
    DEFAULT_MODULE_POWER_KW
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            gun_max_power_kw: GunId::all()
                .map(|gun| (gun.get(), DEFAULT_GUN_MAX_POWER_KW))
                .collect(),
            module_power_kw: DEFAULT_MODULE_POWER_KW,
        }
    }
}

impl StationConfig {
    /// Load configuration, creating the default file when none exists.
    ///
    /// Any read or parse failure returns the defaults so startup proceeds.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!("Created default configuration at {}", path.display()),
                Err(e) => warn!("Failed to write default configuration: {}", e),
            }
            return config;
        }

        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => {
                    info!("Configuration loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid configuration in {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Persist the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }

    /// Maximum allowed power for a gun (kW), defaulting to 240 kW
    pub fn gun_max_power(&self, gun: GunId) -> f64 {
        match self.gun_max_power_kw.get(&gun.get()) {
            Some(&kw) if kw.is_finite() && kw > 0.0 => kw,
            Some(&kw) => {
                warn!("Ignoring bad max power {} for gun {}, using default", kw, gun);
                DEFAULT_GUN_MAX_POWER_KW
            }
            None => DEFAULT_GUN_MAX_POWER_KW,
        }
    }

    /// Rated per-module capacity (kW), defaulting to 40 kW
    pub fn module_power(&self) -> f64 {
        if self.module_power_kw.is_finite() && self.module_power_kw > 0.0 {
            self.module_power_kw
        } else {
            warn!("Ignoring bad module capacity {}, using default", self.module_power_kw);
            DEFAULT_MODULE_POWER_KW
        }
    }

    /// Update the power ceiling for one gun
    pub fn set_gun_max_power(&mut self, gun: GunId, max_kw: f64) {
        self.gun_max_power_kw.insert(gun.get(), max_kw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gun(id: u8) -> GunId {
        GunId::new(id).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = StationConfig::default();
        assert_eq!(config.gun_max_power(gun(1)), 240.0);
        assert_eq!(config.gun_max_power(gun(6)), 240.0);
        assert_eq!(config.module_power(), 40.0);
    }

    #[test]
    fn test_missing_file_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vesec.json");

        let config = StationConfig::load_or_create(&path);
        assert_eq!(config.gun_max_power(gun(3)), 240.0);
        assert!(path.exists());

        // Second load reads the file just written
        let reloaded = StationConfig::load_or_create(&path);
        assert_eq!(reloaded.module_power(), 40.0);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vesec.json");
        fs::write(&path, "not json {{{").unwrap();

        let config = StationConfig::load_or_create(&path);
        assert_eq!(config.gun_max_power(gun(1)), 240.0);
        assert_eq!(config.module_power(), 40.0);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vesec.json");

        let mut config = StationConfig::default();
        config.set_gun_max_power(gun(2), 120.0);
        config.save(&path).unwrap();

        let reloaded = StationConfig::load_or_create(&path);
        assert_eq!(reloaded.gun_max_power(gun(2)), 120.0);
        assert_eq!(reloaded.gun_max_power(gun(1)), 240.0);
    }

    #[test]
    fn test_bad_stored_values_fall_back() {
        let mut config = StationConfig::default();
        config.set_gun_max_power(gun(4), -5.0);
        assert_eq!(config.gun_max_power(gun(4)), 240.0);

        config.set_gun_max_power(gun(4), f64::NAN);
        assert_eq!(config.gun_max_power(gun(4)), 240.0);
    }

    #[test]
    fn test_partial_file_gets_module_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vesec.json");
        fs::write(&path, r#"{"gun_max_power_kw": {"1": 180.0}}"#).unwrap();

        let config = StationConfig::load_or_create(&path);
        assert_eq!(config.gun_max_power(gun(1)), 180.0);
        assert_eq!(config.gun_max_power(gun(2)), 240.0);
        assert_eq!(config.module_power(), 40.0);
    }
}
