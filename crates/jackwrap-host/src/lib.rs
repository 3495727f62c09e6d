//! JACK and LV2 glue for jackwrap
//!
//! Loads the plugin and UI binaries named by a [`Manifest`], registers one
//! JACK port per plugin audio or MIDI port and drives the
//! [`jackwrap_core::CycleProcessor`] from the JACK process callback.

pub mod error;
pub mod jack;
pub mod lv2;
pub mod manifest;
pub mod memory;
pub mod ui;

pub use crate::jack::{open_client, JackCycle, JackNotifications, JackPorts, JackProcess};
pub use error::{HostError, LoadStage, Result};
pub use lv2::{HostFeatures, Lv2Plugin};
pub use manifest::{Binary, Manifest};
pub use memory::lock_memory;
pub use ui::{Lv2ExternalUi, UiSetup};
