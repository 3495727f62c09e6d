//! Wrapper configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bytes of one `ControlUpdate` on the wire (`u32` port + `f32` value).
pub const CONTROL_MESSAGE_SIZE: usize = 8;

/// Sizes and rates that shape the buffers allocated at startup.
///
/// Nothing here can change once the processor is built; the queues and
/// sequence buffers are sized from these values exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapperConfig {
    /// Maximum number of audio cycles per UI refresh the queues must absorb.
    pub update_freq_ratio: usize,
    /// UI refresh rate when nothing wakes the control thread.
    pub ui_update_fps: u32,
    /// Capacity in bytes of each atom sequence buffer (header included).
    pub atom_capacity: usize,
    /// Emit a `time:Position` event whenever the transport changes.
    pub send_time_info: bool,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            update_freq_ratio: 10,
            ui_update_fps: 15,
            atom_capacity: 8192,
            send_time_info: true,
        }
    }
}

impl WrapperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.update_freq_ratio == 0 {
            return Err(Error::InvalidConfig(
                "update_freq_ratio must be at least 1".to_string(),
            ));
        }
        if self.ui_update_fps == 0 || self.ui_update_fps > 1000 {
            return Err(Error::InvalidConfig(format!(
                "ui_update_fps {} out of range (1-1000)",
                self.ui_update_fps
            )));
        }
        if self.atom_capacity < 64 || self.atom_capacity % 8 != 0 {
            return Err(Error::InvalidConfig(format!(
                "atom_capacity {} must be a multiple of 8 and at least 64 bytes",
                self.atom_capacity
            )));
        }
        Ok(())
    }

    /// Upper bound on how long the control thread sleeps between refreshes.
    pub fn ui_refresh_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.ui_update_fps.max(1)))
    }

    /// Byte capacity of each control-update queue for `n_controls` ports.
    pub fn control_queue_capacity(&self, n_controls: usize) -> usize {
        // A plugin without controls still gets a minimal queue so the channel
        // halves exist; nothing is ever written to it.
        self.update_freq_ratio * n_controls.max(1) * CONTROL_MESSAGE_SIZE
    }

    /// Byte capacity of each event-blob queue.
    pub fn event_queue_capacity(&self) -> usize {
        self.update_freq_ratio * self.atom_capacity
    }
}
