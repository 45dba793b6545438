//! Actuation commands emitted toward the hardware signaling layer
//!
//! The core does not speak the hardware bus itself; it emits typed command
//! frames on a channel and the hosting process bridges them to CAN/GPIO.
//! No acknowledgement channel exists at this boundary: commands are
//! fire-and-forget and a deployment needs its own timeout/retry contract
//! underneath.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{GunId, ModuleId};

/// Start/stop action for a power module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleAction {
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "STOP")]
    Stop,
}

/// Close/open action for a gun-to-module contactor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactorAction {
    #[serde(rename = "CLOSE")]
    Close,
    #[serde(rename = "OPEN")]
    Open,
}

/// Command frames handed to the hardware bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HardwareCommand {
    #[serde(rename = "MODULE")]
    Module {
        module_id: ModuleId,
        command: ModuleAction,
    },

    #[serde(rename = "CONTACTOR")]
    Contactor {
        gun_id: GunId,
        module_id: ModuleId,
        command: ContactorAction,
    },
}

impl HardwareCommand {
    /// Serialize command to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize command from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Sender half of the command channel, shared by bank and matrix
#[derive(Clone)]
pub struct CommandBus {
    tx: mpsc::UnboundedSender<HardwareCommand>,
}

impl CommandBus {
    /// Create a bus plus the receiver the hardware bridge drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HardwareCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit a command frame.
    ///
    /// A closed receiver means the bridge is gone; the command is dropped,
    /// matching the no-ack contract of this boundary.
    pub fn send(&self, command: HardwareCommand) {
        debug!("Emitting {:?}", command);
        let _ = self.tx.send(command);
    }
}
