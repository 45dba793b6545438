//! Telemetry ingest boundary
//!
//! The pub/sub transport itself lives outside the core; whatever carries the
//! messages hands topic and payload strings to [`parse_update`]. Parsing is
//! an explicit validate step with typed failures, so a malformed update is a
//! distinguishable outcome that gets dropped and logged while the prior
//! value stays in effect.
//!
//! Topic grammar: `vesec/{gun_id}/{kind}/{device}` with
//! `kind` one of `soc`, `demand`, `vehicle_status`.

use serde::{Deserialize, Serialize};

use crate::types::{GunId, StationError, VehicleStatus};

/// Topic prefix shared by all station telemetry
pub const TOPIC_PREFIX: &str = "vesec";

/// Kind segment of a telemetry topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Soc,
    Demand,
    VehicleStatus,
}

impl std::str::FromStr for MessageKind {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soc" => Ok(MessageKind::Soc),
            "demand" => Ok(MessageKind::Demand),
            "vehicle_status" => Ok(MessageKind::VehicleStatus),
            other => Err(StationError::MalformedTopic(other.to_string())),
        }
    }
}

/// Parsed form of a telemetry topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPath {
    pub gun_id: GunId,
    pub kind: MessageKind,
    /// Reporting device (dispenser id or `central`), carried for logging
    pub device: String,
}

impl std::str::FromStr for TopicPath {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 4 || parts[0] != TOPIC_PREFIX {
            return Err(StationError::MalformedTopic(s.to_string()));
        }

        let raw_gun: u8 = parts[1]
            .parse()
            .map_err(|_| StationError::MalformedTopic(s.to_string()))?;
        let gun_id = GunId::new(raw_gun)?;
        let kind = parts[2].parse()?;

        Ok(Self {
            gun_id,
            kind,
            device: parts[3].to_string(),
        })
    }
}

/// A validated telemetry event ready for the allocation engine
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryUpdate {
    Demand { gun: GunId, kilowatts: f64 },
    Soc { gun: GunId, percent: f64 },
    VehicleStatus { gun: GunId, status: VehicleStatus },
}

impl TelemetryUpdate {
    /// Gun the update refers to
    pub fn gun(&self) -> GunId {
        match self {
            TelemetryUpdate::Demand { gun, .. } => *gun,
            TelemetryUpdate::Soc { gun, .. } => *gun,
            TelemetryUpdate::VehicleStatus { gun, .. } => *gun,
        }
    }
}

/// Parse and validate one inbound message.
///
/// Demand must be a finite float ≥ 0 kW, SOC a finite float in 0..=100,
/// vehicle status one of the named states.
pub fn parse_update(topic: &str, payload: &str) -> Result<TelemetryUpdate, StationError> {
    let path: TopicPath = topic.parse()?;

    match path.kind {
        MessageKind::Demand => {
            let kilowatts = parse_non_negative(payload, "demand")?;
            Ok(TelemetryUpdate::Demand {
                gun: path.gun_id,
                kilowatts,
            })
        }
        MessageKind::Soc => {
            let percent = parse_non_negative(payload, "soc")?;
            if percent > 100.0 {
                return Err(StationError::MalformedPayload {
                    kind: "soc",
                    value: payload.to_string(),
                });
            }
            Ok(TelemetryUpdate::Soc {
                gun: path.gun_id,
                percent,
            })
        }
        MessageKind::VehicleStatus => {
            let status = payload.trim().parse()?;
            Ok(TelemetryUpdate::VehicleStatus {
                gun: path.gun_id,
                status,
            })
        }
    }
}

fn parse_non_negative(payload: &str, kind: &'static str) -> Result<f64, StationError> {
    let value: f64 = payload.trim().parse().map_err(|_| StationError::MalformedPayload {
        kind,
        value: payload.to_string(),
    })?;

    if !value.is_finite() || value < 0.0 {
        return Err(StationError::MalformedPayload {
            kind,
            value: payload.to_string(),
        });
    }

    Ok(value)
}
